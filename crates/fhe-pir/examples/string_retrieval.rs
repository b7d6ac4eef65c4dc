// Retrieval of a string from a database without revealing its index.
//
// The client sends one encrypted selection bit per record; the server packs
// each record into a plaintext with the string encoder, and answers with the
// dot product of the selection bits and the records. This query is linear in
// the size of the database, so this example is only meant for small databases.
#![allow(missing_docs)]

use clap::Parser;
use fhe::bfv::{Encoding, Plaintext};
use fhe_pir::{Context, ContextConfigBuilder};
use fhe_traits::FheEncoder;
use indicatif::HumanBytes;
use rand::{rng, Rng};
use std::{error::Error, time::Instant};

#[derive(Parser)]
struct Cli {
    #[arg(
        long,
        help = "The number of elements in the database",
        default_value = "16"
    )]
    database_size: usize,

    #[arg(
        long,
        help = "The size of each database element",
        default_value = "1024"
    )]
    element_size: usize,

    #[arg(long, help = "The polynomial degree", default_value = "4096")]
    degree: usize,
}

macro_rules! timeit {
    ($name:expr, $code:expr) => {{
        let start = Instant::now();
        let r = $code;
        println!("⏱  {}: {:?}", $name, start.elapsed());
        r
    }};
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let args = Cli::parse();
    let database_size = args.database_size;
    let elements_size = args.element_size;

    let config = ContextConfigBuilder::new()
        .set_degree(args.degree)
        .build()?;
    let client = timeit!(
        "Client setup",
        Context::with_config(&config, database_size)?
    );

    let max_element_size = client.string_encoder().capacity();
    if elements_size > max_element_size || elements_size == 0 || database_size == 0 {
        log::error!("Invalid parameters: database_size = {database_size}, elements_size = {elements_size}. The maximum element size is {max_element_size}.");
        clap::Error::new(clap::error::ErrorKind::InvalidValue).exit();
    }

    println!("# String retrieval with fhe-pir");
    println!(
        "database of {}",
        HumanBytes((database_size * elements_size) as u64)
    );
    println!("\tdatabase_size = {database_size}");
    println!("\telements_size = {elements_size}");

    let mut rng = rng();
    let database = (0..database_size)
        .map(|_| (0..elements_size).map(|_| rng.random()).collect::<Vec<u8>>())
        .collect::<Vec<_>>();

    // The server only receives the parameters, and generates its own keys.
    let parameters = client.serialize_parameters();
    println!("📄 Parameters: {}", HumanBytes(parameters.len() as u64));
    let server = timeit!(
        "Server setup",
        Context::from_parameters_bytes(&parameters, database_size)?
    );

    let encoded_database = timeit!(
        "Database preprocessing",
        database
            .iter()
            .map(|element| server.string_encoder().encode(element))
            .collect::<fhe_pir::Result<Vec<_>>>()?
    );

    let index = rng.random_range(0..database_size);
    let query = timeit!("Client query", {
        (0..database_size)
            .map(|i| -> Result<Vec<u8>, Box<dyn Error>> {
                let pt = Plaintext::try_encode(
                    &[(i == index) as u64] as &[u64],
                    Encoding::poly(),
                    client.parameters(),
                )?;
                Ok(client.serialize(&client.encrypt_plaintext(&pt)?))
            })
            .collect::<Result<Vec<_>, Box<dyn Error>>>()?
    });
    println!(
        "📄 Query: {}",
        HumanBytes(query.iter().map(|q| q.len()).sum::<usize>() as u64)
    );

    let response = timeit!("Server response", {
        let cts = query
            .iter()
            .map(|bytes| server.deserialize(bytes))
            .collect::<fhe_pir::Result<Vec<_>>>()?;
        let ct = server.evaluator().dot_product(&cts, &encoded_database)?;
        server.serialize(&ct)
    });
    println!("📄 Response: {}", HumanBytes(response.len() as u64));

    let answer = timeit!("Client answer", {
        let pt = client.decrypt_ciphertext(&client.deserialize(&response)?)?;
        client.string_encoder().decode(&pt)?
    });

    assert_eq!(&answer[..elements_size], &database[index]);
    println!("✅ Retrieved element {index}");

    Ok(())
}
