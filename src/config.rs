use argon2::Params;
use secrecy::SecretString;

/// Longest token lifetime accepted from config: one year.
pub const MAX_TTL_MINUTES: i64 = 60 * 24 * 365;

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: SecretString,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    pub leeway_seconds: u64,
}

impl JwtConfig {
    pub fn check(&self) -> anyhow::Result<()> {
        if !(1..=MAX_TTL_MINUTES).contains(&self.ttl_minutes) {
            anyhow::bail!(
                "JWT_TTL_MINUTES must be between 1 and {MAX_TTL_MINUTES}, got {}",
                self.ttl_minutes
            );
        }
        Ok(())
    }
}

/// Argon2 work factor.
#[derive(Debug, Clone, Copy)]
pub struct PasswordConfig {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            memory_kib: Params::DEFAULT_M_COST,
            iterations: Params::DEFAULT_T_COST,
            parallelism: Params::DEFAULT_P_COST,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub password: PasswordConfig,
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: SecretString::from(std::env::var("JWT_SECRET")?),
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "messenger".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "messenger-users".into()),
            ttl_minutes: env_or("JWT_TTL_MINUTES", 60 * 24),
            leeway_seconds: env_or("JWT_LEEWAY_SECONDS", 0),
        };
        jwt.check()?;
        let defaults = PasswordConfig::default();
        let password = PasswordConfig {
            memory_kib: env_or("ARGON2_MEMORY_KIB", defaults.memory_kib),
            iterations: env_or("ARGON2_ITERATIONS", defaults.iterations),
            parallelism: env_or("ARGON2_PARALLELISM", defaults.parallelism),
        };
        Ok(Self {
            database_url,
            jwt,
            password,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jwt(ttl_minutes: i64) -> JwtConfig {
        JwtConfig {
            secret: SecretString::from("s".to_string()),
            issuer: "iss".into(),
            audience: "aud".into(),
            ttl_minutes,
            leeway_seconds: 0,
        }
    }

    #[test]
    fn ttl_must_be_positive_and_bounded() {
        assert!(jwt(60).check().is_ok());
        assert!(jwt(MAX_TTL_MINUTES).check().is_ok());
        assert!(jwt(0).check().is_err());
        assert!(jwt(-5).check().is_err());
        assert!(jwt(MAX_TTL_MINUTES + 1).check().is_err());
        assert!(jwt(i64::MAX).check().is_err());
    }
}
