use crate::api::v1::RequestGate;
use crate::application_impl::*;
use crate::application_port::*;
use crate::domain_port::*;
use crate::infra_mysql::*;
use crate::infra_redis::*;
use crate::logger::*;
use crate::settings::Settings;
use sqlx::{MySql, Pool};
use std::sync::Arc;
use std::time::Duration;

pub struct Server {
    pub auth_service: Arc<dyn AuthService>,
    pub request_gate: Arc<RequestGate>,
    pool: Option<Pool<MySql>>,
}

impl Server {
    pub async fn try_new(settings: &Settings) -> anyhow::Result<Self> {
        let redis_client = redis::Client::open(settings.redis.url.as_str())?;
        let redis_manager = redis_client.get_connection_manager().await?;
        let session_store: Arc<dyn SessionStore> = Arc::new(RedisSessionStore::new(
            redis_manager,
            settings.redis.prefix.clone(),
        ));

        let token_codec: Arc<dyn TokenCodec> = Arc::new(JwtTokenCodec::new(TokenCodecConfig {
            access_secret_b64: settings.auth.access_secret.clone(),
            refresh_secret_b64: settings.auth.refresh_secret.clone(),
            access_ttl: Duration::from_millis(settings.auth.access_ttl_ms),
            refresh_ttl: Duration::from_millis(settings.auth.refresh_ttl_ms),
        })?);

        let credential_hasher: Arc<dyn CredentialHasher> = Arc::new(Argon2PasswordHasher);

        let mut pool = None;
        let member_repo: Arc<dyn MemberRepo> = match settings.member.backend.as_str() {
            "fake" => Arc::new(FakeMemberRepo::new()),
            "real" => {
                let p = Pool::<MySql>::connect(&settings.mysql.url).await?;
                pool = Some(p.clone());
                Arc::new(MySqlMemberRepo::new(p))
            }
            other => return Err(anyhow::anyhow!("Unknown member backend: {}", other)),
        };

        let auth_service: Arc<dyn AuthService> = Arc::new(RealAuthService::new(
            member_repo,
            credential_hasher,
            token_codec.clone(),
            session_store.clone(),
        ));

        let request_gate = Arc::new(RequestGate::from_settings(
            token_codec,
            session_store,
            &settings.filter,
        )?);

        info!("server started");

        Ok(Self {
            auth_service,
            request_gate,
            pool,
        })
    }

    /// Assemble from already-built parts. No external connections.
    pub fn from_parts(auth_service: Arc<dyn AuthService>, request_gate: Arc<RequestGate>) -> Self {
        Server {
            auth_service,
            request_gate,
            pool: None,
        }
    }

    pub async fn shutdown(&self) {
        info!("server shutting down...");

        if let Some(pool) = &self.pool {
            pool.close().await;
        }
    }
}
