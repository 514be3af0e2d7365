use actix_web::{web, App, HttpServer};
use anyhow::anyhow;
use async_trait::async_trait;

use crate::credentials::TokenProvider;

/// Runs an in-process actix server on an ephemeral port and returns its base URL.
/// Must be called from inside an actix system (`#[actix_web::test]`).
pub fn spawn_upstream<F>(configure: F) -> String
where
    F: Fn(&mut web::ServiceConfig) + Send + Clone + 'static,
{
    let server = HttpServer::new(move || App::new().configure(configure.clone()))
        .workers(1)
        .bind(("127.0.0.1", 0))
        .expect("bind upstream");
    let addr = server.addrs()[0];
    actix_web::rt::spawn(server.run());
    format!("http://{addr}")
}

pub struct StaticToken;

#[async_trait]
impl TokenProvider for StaticToken {
    async fn access_token(&self) -> anyhow::Result<String> {
        Ok("test-token".to_string())
    }
}

pub struct BrokenCredentials;

#[async_trait]
impl TokenProvider for BrokenCredentials {
    async fn access_token(&self) -> anyhow::Result<String> {
        Err(anyhow!("could not load the default credentials"))
    }
}
