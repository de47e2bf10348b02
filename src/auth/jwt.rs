use std::sync::Arc;
use std::time::Duration;

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

use super::claims::{Claims, TokenKind};
use crate::config::JwtConfig;
use crate::users::model::User;

/// Signing material for one token kind.
struct KindKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

struct JwtKeys {
    access: KindKeys,
    refresh: KindKeys,
    issuer: String,
    audience: String,
}

/// Freshly minted access/refresh pair.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Signs and verifies access and refresh tokens. Each kind has its own
/// secret, so a token of one kind never verifies as the other.
#[derive(Clone)]
pub struct TokenIssuer {
    keys: Arc<JwtKeys>,
}

impl TokenIssuer {
    pub fn from_config(cfg: &JwtConfig) -> Self {
        let keys_for = |secret: &str, minutes: i64| KindKeys {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::from_secs((minutes.max(0) as u64) * 60),
        };
        Self {
            keys: Arc::new(JwtKeys {
                access: keys_for(&cfg.access_secret, cfg.access_ttl_minutes),
                refresh: keys_for(&cfg.refresh_secret, cfg.refresh_ttl_minutes),
                issuer: cfg.issuer.clone(),
                audience: cfg.audience.clone(),
            }),
        }
    }

    fn kind_keys(&self, kind: TokenKind) -> &KindKeys {
        match kind {
            TokenKind::Access => &self.keys.access,
            TokenKind::Refresh => &self.keys.refresh,
        }
    }

    pub fn ttl(&self, kind: TokenKind) -> Duration {
        self.kind_keys(kind).ttl
    }

    fn claims_for(&self, user: &User, kind: TokenKind) -> Claims {
        let now = OffsetDateTime::now_utc();
        let exp = now + TimeDuration::seconds(self.ttl(kind).as_secs() as i64);
        Claims {
            sub: user.id,
            role: user.role,
            email: user.email.clone(),
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
            iss: self.keys.issuer.clone(),
            aud: self.keys.audience.clone(),
            jti: Uuid::new_v4(),
            kind,
        }
    }

    fn sign_claims(&self, claims: &Claims) -> anyhow::Result<String> {
        let token = encode(
            &Header::default(),
            claims,
            &self.kind_keys(claims.kind).encoding,
        )?;
        debug!(user_id = %claims.sub, kind = ?claims.kind, "jwt signed");
        Ok(token)
    }

    /// Sign the access and refresh tokens concurrently on the blocking pool.
    pub async fn issue_pair(&self, user: &User) -> anyhow::Result<TokenPair> {
        let access_claims = self.claims_for(user, TokenKind::Access);
        let refresh_claims = self.claims_for(user, TokenKind::Refresh);
        let (a, r) = (self.clone(), self.clone());

        let (access_token, refresh_token) = tokio::try_join!(
            tokio::task::spawn_blocking(move || a.sign_claims(&access_claims)),
            tokio::task::spawn_blocking(move || r.sign_claims(&refresh_claims)),
        )?;

        Ok(TokenPair {
            access_token: access_token?,
            refresh_token: refresh_token?,
        })
    }

    fn verify(&self, token: &str, kind: TokenKind) -> anyhow::Result<Claims> {
        let mut validation = Validation::default();
        validation.set_audience(std::slice::from_ref(&self.keys.audience));
        validation.set_issuer(std::slice::from_ref(&self.keys.issuer));
        let data = decode::<Claims>(token, &self.kind_keys(kind).decoding, &validation)?;
        if data.claims.kind != kind {
            anyhow::bail!("expected {:?} token, got {:?}", kind, data.claims.kind);
        }
        debug!(user_id = %data.claims.sub, kind = ?kind, "jwt verified");
        Ok(data.claims)
    }

    pub fn verify_access(&self, token: &str) -> anyhow::Result<Claims> {
        self.verify(token, TokenKind::Access)
    }

    pub fn verify_refresh(&self, token: &str) -> anyhow::Result<Claims> {
        self.verify(token, TokenKind::Refresh)
    }
}
