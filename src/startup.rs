use std::{net::TcpListener, sync::Arc};

use actix_web::{
    dev::Server,
    error::InternalError,
    middleware::Logger,
    web::{self, Data},
    App, HttpResponse, HttpServer,
};
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    accounts::{AccountSettings, Accounts},
    authentication::{JwtKeys, JwtMiddleware},
    clock::SystemClock,
    configuration::{DatabaseSettings, EmailSettings, Settings},
    email::{DeliveryPolicy, EmailSender, NotificationDispatcher, SandboxEmailSender, SmtpEmailSender},
    migrations::run_migrations,
    routes::{
        change_credentials, forgot_password, get_user_by_id, login, register, reset_password,
        update_user,
    },
    store::PostgresStore,
};

pub struct Application {
    port: u16,
    server: Server,
}

impl Application {
    pub async fn build(configuration: Settings) -> Result<Self, anyhow::Error> {
        let connection_pool = get_connection_pool(&configuration.database);
        run_migrations(&connection_pool).await?;

        let email_sender = get_email_sender(&configuration.email)?;
        let notifier = NotificationDispatcher::spawn(
            email_sender,
            DeliveryPolicy::from_settings(&configuration.email),
            configuration.email.queue_capacity,
        );
        let accounts = Accounts::new(
            Arc::new(PostgresStore::new(connection_pool)),
            notifier,
            Arc::new(JwtKeys::from_settings(&configuration.jwt)),
            AccountSettings::from_settings(&configuration),
            Arc::new(SystemClock),
        )?;

        let address = format!(
            "{}:{}",
            configuration.application.host, configuration.application.port
        );
        let listener = TcpListener::bind(address)?;
        let port = listener.local_addr()?.port();
        let server = run(listener, accounts)?;

        Ok(Self { port, server })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped(self) -> Result<(), std::io::Error> {
        self.server.await
    }
}

pub fn get_connection_pool(configuration: &DatabaseSettings) -> PgPool {
    PgPoolOptions::new()
        .max_connections(configuration.max_connections)
        .acquire_timeout(configuration.acquire_timeout())
        .connect_lazy_with(configuration.connect_options())
}

fn get_email_sender(configuration: &EmailSettings) -> Result<Arc<dyn EmailSender>, anyhow::Error> {
    match configuration.smtp_host.as_deref() {
        Some(host) => Ok(Arc::new(SmtpEmailSender::from_settings(configuration, host)?)),
        None => {
            tracing::warn!("No SMTP host configured, emails go to the sandbox sender");
            Ok(Arc::new(SandboxEmailSender::new()))
        }
    }
}

/// Malformed JSON bodies get the same `{"message": ...}` shape as every other error.
fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        let response = HttpResponse::BadRequest().json(serde_json::json!({
            "message": format!("invalid request body: {err}"),
        }));
        InternalError::from_response(err, response).into()
    })
}

/// Unparseable path segments such as `/api/user/abc` get the same error shape.
fn path_config() -> web::PathConfig {
    web::PathConfig::default().error_handler(|err, _req| {
        let response = HttpResponse::NotFound().json(serde_json::json!({
            "message": format!("invalid path: {err}"),
        }));
        InternalError::from_response(err, response).into()
    })
}

/// Mount every route under `/api`. Protected routes sit behind the JWT gate.
pub fn configure(cfg: &mut web::ServiceConfig, accounts: Data<Accounts>) {
    let gate = JwtMiddleware::new(accounts.jwt_keys());
    cfg.app_data(accounts)
        .app_data(json_config())
        .app_data(path_config())
        .service(
            web::scope("/api")
                .route("/register", web::post().to(register))
                .route("/login", web::post().to(login))
                .route("/forgot-password", web::post().to(forgot_password))
                .route("/reset-password", web::post().to(reset_password))
                .service(
                    web::scope("/user")
                        .wrap(gate)
                        .route("/{id}", web::get().to(get_user_by_id))
                        .route("/{id}", web::put().to(update_user))
                        .route("/{id}/credentials", web::post().to(change_credentials)),
                )
                .default_service(web::to(route_not_found)),
        );
}

async fn route_not_found() -> HttpResponse {
    HttpResponse::NotFound().json(serde_json::json!({ "message": "not found" }))
}

pub fn run(listener: TcpListener, accounts: Accounts) -> Result<Server, anyhow::Error> {
    let accounts = Data::new(accounts);
    let server = HttpServer::new(move || {
        let accounts = accounts.clone();
        App::new()
            .wrap(Logger::default())
            .configure(|cfg| configure(cfg, accounts))
    })
    .listen(listener)?
    .run();
    Ok(server)
}
