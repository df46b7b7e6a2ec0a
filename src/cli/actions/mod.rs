pub mod server;

use secrecy::SecretString;

#[derive(Debug)]
pub enum Action {
    Server {
        port: u16,
        dsn: String,
        token_secret: SecretString,
        token_ttl_seconds: i64,
        remember_token_ttl_seconds: i64,
        frontend_url: String,
        bcrypt_cost: u32,
    },
}
