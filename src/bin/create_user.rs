use std::io::{self, Write};

use clap::Parser;
use sqlx::postgres::PgPoolOptions;

use carqr_api::auth::HashingConfig;
use carqr_api::auth::passwords::PasswordService;

#[derive(Parser, Debug)]
#[command(name = "create_user", about = "Create a Car QR account directly in the database")]
struct Args {
    /// Email address for the account.
    #[arg(long)]
    email: String,

    /// Phone number for the account (must be unique).
    #[arg(long)]
    phone_number: String,

    /// Plaintext password to hash and store for this account.
    #[arg(long)]
    password: String,

    /// Optional first name.
    #[arg(long, default_value = "")]
    first_name: String,

    /// Optional last name.
    #[arg(long, default_value = "")]
    last_name: String,

    /// Expose the phone number in public plate lookups.
    #[arg(long)]
    show_phone_number: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();

    let args = Args::parse();
    let email = args.email.trim().to_string();

    if !email.contains('@') {
        writeln!(io::stderr(), "error: email must contain '@'")?;
        std::process::exit(1);
    }

    let database_url = std::env::var("DATABASE_URL")?;
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await?;

    let existing = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM users WHERE email = $1 OR phone_number = $2",
    )
    .bind(&email)
    .bind(&args.phone_number)
    .fetch_one(&pool)
    .await?;

    if existing > 0 {
        writeln!(
            io::stderr(),
            "error: a user with email '{email}' or phone '{}' already exists.",
            args.phone_number
        )?;
        std::process::exit(1);
    }

    let password_service = PasswordService::from_config(&HashingConfig::from_env()).map_err(
        |err| io::Error::new(io::ErrorKind::Other, format!("argon2 init failed: {err}")),
    )?;
    let password_hash = password_service
        .hash_password(&args.password)
        .map_err(|err| {
            io::Error::new(io::ErrorKind::Other, format!("password hash failed: {err}"))
        })?;

    let user_id: i32 = sqlx::query_scalar(
        r#"INSERT INTO users (email, phone_number, password_hash, first_name, last_name, show_phone_number)
           VALUES ($1, $2, $3, $4, $5, $6) RETURNING id"#,
    )
    .bind(&email)
    .bind(&args.phone_number)
    .bind(&password_hash)
    .bind(&args.first_name)
    .bind(&args.last_name)
    .bind(args.show_phone_number)
    .fetch_one(&pool)
    .await?;

    println!("Created user '{email}' with id {user_id}");
    Ok(())
}
