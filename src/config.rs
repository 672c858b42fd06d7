use std::env;

/// Runtime configuration, read from the process environment exactly once at
/// startup. The components that need a secret (token signer, mailer) receive
/// it from here; nothing else in the crate touches the environment.
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub sendgrid_api_key: String,
    pub mail_from: String,
    pub server_port: u16,
    pub server_host: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            database_url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
            jwt_secret: env::var("JWT_SECRET").expect("JWT_SECRET must be set"),
            sendgrid_api_key: env::var("SENDGRID_API_KEY")
                .expect("SENDGRID_API_KEY must be set"),
            mail_from: env::var("MAIL_FROM")
                .unwrap_or_else(|_| "noreply@tasknest.dev".to_string()),
            server_port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "7000".to_string())
                .parse()
                .expect("SERVER_PORT must be a number"),
            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
        }
    }

    pub fn server_url(&self) -> String {
        format!("http://{}:{}", self.server_host, self.server_port)
    }
}
