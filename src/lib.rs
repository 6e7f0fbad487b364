#[macro_use]
extern crate rocket;

pub mod auth;
pub mod db;
pub mod error;
pub mod models;
pub mod request_logger;
pub mod routes;

use crate::auth::{AuthConfig, AuthState, JwtService, PasswordService};
use crate::db::CarQrDb;
use crate::request_logger::RequestLogger;
use env_logger::Env;
use rocket::fairing::AdHoc;
use rocket::http::Method;
use rocket::{Build, Rocket};
use rocket_cors::{AllowedOrigins, CorsOptions};
use rocket_db_pools::Database;
use rocket_okapi::{
    openapi_get_routes,
    rapidoc::{GeneralConfig, HideShowConfig, RapiDocConfig, make_rapidoc},
    settings::UrlObject,
    swagger_ui::{SwaggerUIConfig, make_swagger_ui},
};
use std::sync::Once;

static LOGGER: Once = Once::new();

fn init_logger() {
    LOGGER.call_once(|| {
        env_logger::Builder::from_env(
            Env::default().default_filter_or("info,rocket::server=warn,rocket::request=warn"),
        )
        .init();
    });
}

pub fn rocket() -> Rocket<Build> {
    init_logger();

    // Configure CORS
    let cors = CorsOptions::default()
        .allowed_origins(AllowedOrigins::all())
        .allowed_methods(
            vec![
                Method::Get,
                Method::Post,
                Method::Delete,
                Method::Patch,
            ]
            .into_iter()
            .map(From::from)
            .collect(),
        )
        .allow_credentials(true)
        .to_cors()
        .expect("Error creating CORS");

    rocket::build()
        .attach(RequestLogger)
        .attach(CarQrDb::init())
        .attach(cors)
        // Run database migrations on startup
        .attach(AdHoc::try_on_ignite("Run Migrations", |rocket| async move {
            match CarQrDb::fetch(&rocket) {
                Some(db) => {
                    let pool = (**db).clone();
                    match db::run_migrations(&pool).await {
                        Ok(_) => {
                            log::info!("database migrations successful");
                            Ok(rocket)
                        }
                        Err(e) => {
                            log::error!("database migrations failed: {}", e);
                            Err(rocket)
                        }
                    }
                }
                None => {
                    log::error!("database pool not available for migrations");
                    Err(rocket)
                }
            }
        }))
        // Clone the pool out of the rocket_db_pools database so request
        // guards can reach it as plain managed state.
        .attach(AdHoc::try_on_ignite("Manage DB Pool", |rocket| async move {
            match CarQrDb::fetch(&rocket) {
                Some(db) => {
                    let pool = (**db).clone();
                    Ok(rocket.manage(pool))
                }
                None => Err(rocket),
            }
        }))
        // Construct the auth stack once from the environment; everything
        // downstream receives it through managed state.
        .attach(AdHoc::try_on_ignite("Auth State", |rocket| async move {
            let config = match AuthConfig::from_env() {
                Ok(config) => config,
                Err(err) => {
                    log::error!("auth configuration invalid: {}", err);
                    return Err(rocket);
                }
            };
            let password_service = match PasswordService::from_config(&config.hashing) {
                Ok(service) => service,
                Err(err) => {
                    log::error!("password hasher initialization failed: {}", err);
                    return Err(rocket);
                }
            };
            let jwt_service = JwtService::from_config(&config);
            Ok(rocket.manage(AuthState::new(config, password_service, jwt_service)))
        }))
        .register("/", catchers![error::unauthorized])
        .mount(
            "/",
            openapi_get_routes![
                // Health routes
                routes::health::health_check,
                // Account routes
                routes::users::register,
                routes::users::me,
                // Auth routes
                auth::routes::issue_token,
                auth::routes::start_session,
                auth::routes::session_status,
                auth::routes::end_session,
                // Car routes
                routes::cars::create_car,
                routes::cars::list_cars,
                routes::cars::update_car,
                routes::cars::delete_car,
                // Public routes
                routes::public::find_car_by_plate,
            ],
        )
        .mount(
            "/docs/swagger/",
            make_swagger_ui(&SwaggerUIConfig {
                url: "../../openapi.json".to_owned(),
                ..Default::default()
            }),
        )
        .mount(
            "/docs/rapidoc/",
            make_rapidoc(&RapiDocConfig {
                general: GeneralConfig {
                    spec_urls: vec![UrlObject::new("Car QR API", "../../openapi.json")],
                    ..Default::default()
                },
                hide_show: HideShowConfig {
                    allow_spec_url_load: false,
                    allow_spec_file_load: false,
                    ..Default::default()
                },
                ..Default::default()
            }),
        )
}

#[cfg_attr(not(test), allow(dead_code))]
pub mod test_support {
    use rocket::config::LogLevel;
    use rocket::figment::Figment;
    use rocket::local::asynchronous::Client as AsyncClient;
    use rocket::local::blocking::Client;
    use rocket::{Build, Rocket, Route};
    use rocket_db_pools::Database;
    use rocket_db_pools::sqlx::{self, PgPool};

    use crate::auth::{AuthConfig, AuthState, HashingConfig, JwtService, PasswordService};
    use crate::db::CarQrDb;

    pub use database::{TestDatabase, TestDatabaseError};

    /// Auth configuration with test-friendly values: fixed secret, plain
    /// cookies, the default 30-minute token lifetime, and cheap Argon2
    /// costs so fixture seeding stays fast.
    pub fn test_auth_config() -> AuthConfig {
        AuthConfig {
            jwt_secret: "super-secret-test-key".into(),
            access_token_ttl_mins: 30,
            session_cookie_name: "carqr_session".into(),
            cookie_domain: None,
            cookie_secure: false,
            hashing: HashingConfig {
                memory_kib: 1024,
                iterations: 1,
                parallelism: 1,
            },
        }
    }

    /// Build an [`AuthState`] from a config, panicking on hasher init
    /// failure (test-only convenience).
    pub fn auth_state_from(config: AuthConfig) -> AuthState {
        let password_service =
            PasswordService::from_config(&config.hashing).expect("password service");
        let jwt_service = JwtService::from_config(&config);
        AuthState::new(config, password_service, jwt_service)
    }

    /// Every application route, for tests that drive whole request flows.
    pub fn api_routes() -> Vec<Route> {
        routes![
            crate::routes::health::health_check,
            crate::routes::users::register,
            crate::routes::users::me,
            crate::auth::routes::issue_token,
            crate::auth::routes::start_session,
            crate::auth::routes::session_status,
            crate::auth::routes::end_session,
            crate::routes::cars::create_car,
            crate::routes::cars::list_cars,
            crate::routes::cars::update_car,
            crate::routes::cars::delete_car,
            crate::routes::public::find_car_by_plate,
        ]
    }

    /// Provision a disposable database, or skip the calling test when no
    /// container runtime is available on the host.
    pub async fn provision_test_db() -> Option<TestDatabase> {
        match TestDatabase::new().await {
            Ok(db) => Some(db),
            Err(TestDatabaseError::Container(err)) => {
                eprintln!("skipping integration test: container runtime unavailable: {err}");
                None
            }
            Err(err) => panic!("failed to provision test database: {err:?}"),
        }
    }

    /// Convenience helpers for seeding accounts and cars in tests.
    pub struct TestFixtures<'a> {
        pool: &'a PgPool,
    }

    impl<'a> TestFixtures<'a> {
        pub fn new(pool: &'a PgPool) -> Self {
            Self { pool }
        }

        /// Insert a user with an argon2-hashed password, returning the new
        /// user id.
        pub async fn insert_user(
            &self,
            email: &str,
            phone_number: &str,
            password: &str,
            show_phone_number: bool,
        ) -> Result<i32, sqlx::Error> {
            let hash = PasswordService::from_config(&test_auth_config().hashing)
                .expect("password service")
                .hash_password(password)
                .expect("password hash");

            sqlx::query_scalar(
                r#"INSERT INTO users (email, phone_number, password_hash, show_phone_number)
                   VALUES ($1, $2, $3, $4) RETURNING id"#,
            )
            .bind(email)
            .bind(phone_number)
            .bind(hash)
            .bind(show_phone_number)
            .fetch_one(self.pool)
            .await
        }

        /// Insert a car owned by the given user, returning the new car id.
        pub async fn insert_car(
            &self,
            owner_id: i32,
            license_plate: &str,
            brand: &str,
            model: &str,
        ) -> Result<i32, sqlx::Error> {
            sqlx::query_scalar(
                r#"INSERT INTO cars (license_plate, brand, model, owner_id)
                   VALUES ($1, $2, $3, $4) RETURNING id"#,
            )
            .bind(license_plate)
            .bind(brand)
            .bind(model)
            .bind(owner_id)
            .fetch_one(self.pool)
            .await
        }
    }

    pub mod database {
        use log::LevelFilter;
        use rocket_db_pools::sqlx::postgres::{PgConnectOptions, PgPoolOptions};
        use rocket_db_pools::sqlx::{self, ConnectOptions, PgPool};
        use testcontainers_modules::postgres::Postgres;
        use testcontainers_modules::testcontainers::{
            ContainerAsync, core::error::TestcontainersError, runners::AsyncRunner,
        };
        use thiserror::Error;
        use uuid::Uuid;

        static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

        #[derive(Debug, Error)]
        pub enum TestDatabaseError {
            #[error("database error: {0}")]
            Sqlx(#[from] sqlx::Error),
            #[error("migration error: {0}")]
            Migration(#[from] sqlx::migrate::MigrateError),
            #[error("container error: {0}")]
            Container(#[from] TestcontainersError),
        }

        /// Ephemeral database factory for integration tests: one disposable
        /// Postgres container per instance, with a uniquely named database
        /// migrated to the current schema.
        pub struct TestDatabase {
            pool: Option<PgPool>,
            url: String,
            container: Option<ContainerAsync<Postgres>>,
        }

        impl TestDatabase {
            /// Provision a fresh database by launching a disposable
            /// Postgres container.
            pub async fn new() -> Result<Self, TestDatabaseError> {
                let container = Postgres::default().start().await?;

                let host = container.get_host().await?.to_string();
                let port = container.get_host_port_ipv4(5432).await?;
                let admin_url = format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

                let admin_options: PgConnectOptions =
                    admin_url.parse().map_err(TestDatabaseError::Sqlx)?;
                let admin_options = admin_options.log_statements(LevelFilter::Off);

                let admin_pool = PgPoolOptions::new()
                    .max_connections(1)
                    .connect_with(admin_options.clone())
                    .await
                    .map_err(TestDatabaseError::Sqlx)?;

                let database_name = format!("carqr_test_{}", Uuid::new_v4().simple());
                let create_sql = format!("CREATE DATABASE \"{}\"", database_name);
                sqlx::query(&create_sql)
                    .execute(&admin_pool)
                    .await
                    .map_err(TestDatabaseError::Sqlx)?;

                let pool = PgPoolOptions::new()
                    .max_connections(5)
                    .connect_with(admin_options.clone().database(&database_name))
                    .await
                    .map_err(TestDatabaseError::Sqlx)?;

                MIGRATOR.run(&pool).await?;

                let url = format!(
                    "postgres://postgres:postgres@{}:{}/{}",
                    host, port, database_name
                );

                Ok(Self {
                    pool: Some(pool),
                    url,
                    container: Some(container),
                })
            }

            /// Connection pool for direct queries in tests.
            pub fn pool(&self) -> &PgPool {
                self.pool.as_ref().expect("test database pool is available")
            }

            /// Clone of the pooled connection handle for Rocket state.
            pub fn pool_clone(&self) -> PgPool {
                self.pool().clone()
            }

            /// Connection URL for wiring the `carqr_db` figment entry.
            pub fn url(&self) -> &str {
                &self.url
            }

            /// Close pool connections and tear down the container.
            pub async fn close(mut self) {
                if let Some(pool) = self.pool.take() {
                    pool.close().await;
                }
                if let Some(container) = self.container.take() {
                    drop(container);
                }
            }
        }
    }

    /// Builder for constructing Rocket instances tailored for integration
    /// tests. Mirrors the production wiring (managed pool, auth state, the
    /// 401 catcher) without environment variables or startup fairings.
    #[derive(Default)]
    pub struct TestRocketBuilder {
        figment: Figment,
        mounts: Vec<(String, Vec<Route>)>,
        pg_pool: Option<PgPool>,
        auth_state: Option<AuthState>,
        attach_db: bool,
    }

    impl TestRocketBuilder {
        /// Start a builder with sensible defaults: random port, logging
        /// disabled.
        pub fn new() -> Self {
            let figment = rocket::Config::figment()
                .merge(("port", 0))
                .merge(("log_level", LogLevel::Off))
                .merge(("cli_colors", false));

            Self {
                figment,
                mounts: Vec::new(),
                pg_pool: None,
                auth_state: None,
                attach_db: false,
            }
        }

        /// Mount routes at the API root.
        pub fn mount_api_routes(mut self, routes: Vec<Route>) -> Self {
            self.mounts.push(("/".to_string(), routes));
            self
        }

        /// Manage a `PgPool` instance for request guards and handlers that
        /// take `&State<PgPool>`.
        pub fn manage_pg_pool(mut self, pool: PgPool) -> Self {
            self.pg_pool = Some(pool);
            self
        }

        /// Manage an [`AuthState`]; most tests pass
        /// `auth_state_from(test_auth_config())`.
        pub fn manage_auth_state(mut self, state: AuthState) -> Self {
            self.auth_state = Some(state);
            self
        }

        /// Point the `carqr_db` pool at the given database and attach its
        /// fairing, for handlers that take `Connection<CarQrDb>`.
        pub fn with_database(mut self, url: &str) -> Self {
            self.figment = self.figment.merge(("databases.carqr_db.url", url));
            self.attach_db = true;
            self
        }

        /// Finish building the Rocket instance.
        pub fn build(self) -> Rocket<Build> {
            let mut rocket =
                rocket::custom(self.figment).register("/", catchers![crate::error::unauthorized]);

            if self.attach_db {
                rocket = rocket.attach(CarQrDb::init());
            }

            for (base, routes) in self.mounts {
                rocket = rocket.mount(base, routes);
            }

            if let Some(pool) = self.pg_pool {
                rocket = rocket.manage(pool);
            }

            if let Some(state) = self.auth_state {
                rocket = rocket.manage(state);
            }

            rocket
        }

        /// Convenience helper to produce a blocking local client.
        pub fn blocking_client(self) -> Client {
            Client::tracked(self.build()).expect("valid Rocket instance")
        }

        /// Convenience helper to produce an asynchronous local client.
        pub async fn async_client(self) -> AsyncClient {
            AsyncClient::tracked(self.build())
                .await
                .expect("valid Rocket instance")
        }
    }
}
