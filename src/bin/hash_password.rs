use clap::Parser;

/// Print a bcrypt hash for seeding a `passwordHash` field by hand.
#[derive(Parser)]
#[command(name = "hash_password")]
#[command(about = "Hash a password the way the API stores it", long_about = None)]
struct Cli {
    /// Password to hash
    password: String,

    /// bcrypt cost factor
    #[arg(short, long, default_value_t = bcrypt::DEFAULT_COST)]
    cost: u32,

    /// Check the password against an existing hash instead of hashing it
    #[arg(long, value_name = "HASH")]
    verify: Option<String>,
}

fn main() {
    let cli = Cli::parse();

    if let Some(hash) = cli.verify {
        match bcrypt::verify(&cli.password, &hash) {
            Ok(true) => println!("match"),
            Ok(false) => {
                println!("no match");
                std::process::exit(1);
            }
            Err(e) => {
                eprintln!("Invalid hash: {}", e);
                std::process::exit(2);
            }
        }
        return;
    }

    if cli.password.chars().count() < 6 {
        eprintln!("Password must be at least 6 characters");
        std::process::exit(2);
    }

    match bcrypt::hash(&cli.password, cli.cost) {
        Ok(hash) => println!("{}", hash),
        Err(e) => {
            eprintln!("Failed to hash password: {}", e);
            std::process::exit(1);
        }
    }
}
