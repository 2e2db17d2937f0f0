use std::{error::Error, path::Path, process::exit, str::FromStr};

use clap::Parser;
use rusqlite::Connection;
use rust_decimal::Decimal;

use subtrack::{
    BillingCycle, CategoryName, NewSubscription, PasswordHash, RenewalDay, SubscriptionName,
    Username, ValidatedPassword, create_category, create_subscription, create_user,
    initialize_db, set_cancellation,
};

/// A utility for creating a test database for the REST API server of subtrack.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to save the SQLite database to.
    #[arg(long, short)]
    output_path: String,
}

/// The categories and subscriptions of the test user.
const TEST_DATA: [(&str, [(&str, &str, BillingCycle, i64); 2]); 3] = [
    (
        "Streaming",
        [
            ("Video", "15.49", BillingCycle::Month, 3),
            ("Music", "11.99", BillingCycle::Month, 21),
        ],
    ),
    (
        "Software",
        [
            ("Password manager", "36.00", BillingCycle::Annual, 1),
            ("Cloud storage", "2.99", BillingCycle::Month, 14),
        ],
    ),
    (
        "News",
        [
            ("Newspaper", "4.50", BillingCycle::Week, 7),
            ("Coffee fund", "0.25", BillingCycle::Day, 1),
        ],
    ),
];

/// Create and populate a database for manual testing.
fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let output_path = Path::new(&args.output_path);

    match output_path.extension() {
        Some(extension) if !extension.is_empty() => {}
        _ => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
    }

    if output_path.is_file() {
        eprintln!("File already exists at {output_path:#?}!");
        exit(1);
    }

    println!("Creating database at {output_path:#?}");
    let connection = Connection::open(output_path)?;

    initialize_db(&connection)?;

    println!("Creating test user...");

    let password_hash = PasswordHash::new(
        ValidatedPassword::new_unchecked("test"),
        PasswordHash::DEFAULT_COST,
    )?;
    let user = create_user(Username::new("test")?, password_hash, &connection)?;

    println!("Creating categories and subscriptions...");

    for (category_name, subscriptions) in TEST_DATA {
        let category = create_category(CategoryName::new(category_name)?, user.id, &connection)?;

        for (name, cost, billing_cycle, renewal_date) in subscriptions {
            create_subscription(
                NewSubscription {
                    name: SubscriptionName::new(name)?,
                    cost: Decimal::from_str(cost)?,
                    billing_cycle,
                    renewal_date: RenewalDay::new(renewal_date)?,
                    account_info: String::new(),
                    category_id: category.id,
                },
                user.id,
                &connection,
            )?;
        }
    }

    let cancelled = create_subscription(
        NewSubscription {
            name: SubscriptionName::new("Old gym membership")?,
            cost: Decimal::from_str("49.99")?,
            billing_cycle: BillingCycle::Month,
            renewal_date: RenewalDay::new(28)?,
            account_info: "member #1234".to_owned(),
            category_id: create_category(CategoryName::new("Health")?, user.id, &connection)?.id,
        },
        user.id,
        &connection,
    )?;
    set_cancellation(
        cancelled.id,
        user.id,
        Some(time::OffsetDateTime::now_utc()),
        &connection,
    )?;

    println!("Success!");

    Ok(())
}
