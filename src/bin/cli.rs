//! SiftKV CLI Client
//!
//! Command-line interface for interacting with a SiftKV server.

use bytes::Bytes;
use clap::{Parser, Subcommand, ValueEnum};
use siftkv::network::{Client, DEFAULT_KEY_FIELD};
use siftkv::protocol::{
    BktRequest, BucketOp, DeleteRequest, GetAllRequest, QryRequest, Request, Response, Status,
};
use siftkv::{FindCondition, SortKey};

/// SiftKV CLI
#[derive(Parser, Debug)]
#[command(name = "siftkv-cli")]
#[command(about = "CLI for the SiftKV record store")]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:8000")]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum BktAction {
    Create,
    Delete,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create or delete a bucket
    Bkt {
        action: BktAction,
        bucket: String,
    },

    /// Get records by key (one key uses getone)
    Get {
        bucket: String,
        #[arg(required = true)]
        keys: Vec<String>,
    },

    /// Get all records in a key range
    Getall {
        bucket: String,
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        end: Option<String>,
    },

    /// Put JSON records, keyed by --key-field
    Put {
        bucket: String,
        #[arg(required = true)]
        records: Vec<String>,
        #[arg(short, long, default_value = DEFAULT_KEY_FIELD)]
        key_field: String,
    },

    /// Put a single JSON record
    Putone {
        bucket: String,
        record: String,
        #[arg(short, long, default_value = DEFAULT_KEY_FIELD)]
        key_field: String,
    },

    /// Delete records by key
    Delete {
        bucket: String,
        #[arg(required = true)]
        keys: Vec<String>,
    },

    /// Filter and sort records
    Qry {
        bucket: String,
        /// Find condition as field:op:value (repeatable)
        #[arg(short, long = "find")]
        find: Vec<FindCondition>,
        /// Sort key as field:dir (repeatable; dir is asc, desc, ascint or descint)
        #[arg(short = 'o', long = "sort")]
        sort: Vec<SortKey>,
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        end: Option<String>,
    },
}

fn main() {
    let args = Args::parse();

    let mut client = match Client::connect(&args.server) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(2);
        }
    };

    let result = match args.command {
        Commands::Bkt { action, bucket } => {
            let operation = match action {
                BktAction::Create => BucketOp::Create,
                BktAction::Delete => BucketOp::Delete,
            };
            client.run(&Request::Bkt(BktRequest { bucket, operation }))
        }
        Commands::Get { bucket, keys } => {
            let keys: Vec<&str> = keys.iter().map(String::as_str).collect();
            client.get(&bucket, &keys)
        }
        Commands::Getall { bucket, start, end } => client.run(&Request::GetAll(GetAllRequest {
            bucket,
            start_key: start,
            end_key: end,
        })),
        Commands::Put {
            bucket,
            records,
            key_field,
        } => {
            let recs = records.into_iter().map(Bytes::from).collect();
            client = client.with_key_field(key_field);
            client.put(&bucket, recs)
        }
        Commands::Putone {
            bucket,
            record,
            key_field,
        } => match serde_json::from_str::<serde_json::Value>(&record) {
            Ok(value) => {
                client = client.with_key_field(key_field);
                client.put_one(&bucket, &value)
            }
            Err(e) => {
                eprintln!("record is not valid JSON: {}", e);
                std::process::exit(2);
            }
        },
        Commands::Delete { bucket, keys } => {
            client.run(&Request::Delete(DeleteRequest { bucket, keys }))
        }
        Commands::Qry {
            bucket,
            find,
            sort,
            start,
            end,
        } => client.run(&Request::Qry(QryRequest {
            bucket,
            find_conditions: find,
            sort_flds: sort,
            start_key: start,
            end_key: end,
        })),
    };

    match result {
        Ok(response) => {
            print_response(&response);
            if response.status == Status::Fail {
                std::process::exit(1);
            }
        }
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(2);
        }
    }
}

fn print_response(response: &Response) {
    println!("status: {:?}", response.status);
    if !response.msg.is_empty() {
        println!("msg: {}", response.msg);
    }
    if let Some(rec) = &response.rec {
        println!("{}", String::from_utf8_lossy(rec));
    }
    for rec in &response.recs {
        println!("{}", String::from_utf8_lossy(rec));
    }
    if response.put_cnt > 0 {
        println!("putCnt: {}", response.put_cnt);
    }
}
