use bcrypt::hash;
use chrono::NaiveDate;
use fake::faker::internet::en::{Password, SafeEmail};
use fake::faker::name::en::{FirstName, LastName};
use fake::Fake;
use futures::future::try_join_all;
use std::error::Error;
use std::sync::Arc;
use twitter_api::config::Config;
use twitter_api::db::{self, UserRecord, UserStore};
use twitter_api::models::{Credentials, Identity, Profile, UserRegister};
use uuid::Uuid;
use validator::Validate;

type SeedError = Box<dyn Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), SeedError> {
    println!("Starting data seeding...");

    let config = Config::from_env()?;
    let store = db::create_store(&config)?;
    println!("Seeding user store {}", config.store_path.display());

    // Configuration
    let num_users: usize = match std::env::var("SEED_USERS") {
        Ok(raw) => raw.trim().parse()?,
        Err(_) => 100,
    };

    seed_users(store, num_users, config.bcrypt_cost).await?;

    println!("Seeding completed!");
    Ok(())
}

fn fake_registration() -> UserRegister {
    let year: i32 = (1950..2006).fake();
    let month: u32 = (1..13).fake();
    let day: u32 = (1..29).fake();

    UserRegister {
        identity: Identity {
            user_id: Uuid::new_v4(),
            email: SafeEmail().fake(),
        },
        profile: Profile {
            first_name: FirstName().fake(),
            last_name: LastName().fake(),
            birth_date: NaiveDate::from_ymd_opt(year, month, day),
        },
        credentials: Credentials {
            password: Password(8..20).fake(),
        },
    }
}

async fn seed_users(store: Arc<dyn UserStore>, count: usize, cost: u32) -> Result<(), SeedError> {
    println!("Creating {} users...", count);

    let tasks = (0..count).map(|_| {
        let store = store.clone();
        tokio::task::spawn_blocking(move || -> Result<UserRecord, SeedError> {
            let registration = fake_registration();
            registration.validate()?;
            let password = hash(registration.credentials.password.as_bytes(), cost)?;
            Ok(store.create(UserRecord::from_registration(registration, password))?)
        })
    });

    let results = try_join_all(tasks).await?;
    for (i, result) in results.into_iter().enumerate() {
        let record = result?;
        println!(
            "Created user {}/{}: {} {} ({})",
            i + 1,
            count,
            record.first_name,
            record.last_name,
            record.user_id
        );
    }

    Ok(())
}
