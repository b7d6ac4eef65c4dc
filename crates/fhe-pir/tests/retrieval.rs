// End-to-end retrieval of records between a client and a server context.
use fhe::bfv::{Encoding, Plaintext};
use fhe_pir::{Context, ContextConfigBuilder, ErrorCode};
use fhe_traits::FheEncoder;
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::error::Error;

fn random_bytes(rng: &mut ChaCha8Rng, len: usize) -> Vec<u8> {
    let mut v = vec![0u8; len];
    rng.fill_bytes(&mut v);
    v
}

fn selection_vector(
    ctx: &Context,
    len: usize,
    index: usize,
) -> Result<Vec<Vec<u8>>, Box<dyn Error>> {
    let mut query = Vec::with_capacity(len);
    for i in 0..len {
        let pt = Plaintext::try_encode(
            &[(i == index) as u64] as &[u64],
            Encoding::poly(),
            ctx.parameters(),
        )?;
        query.push(ctx.serialize(&ctx.encrypt_plaintext(&pt)?));
    }
    Ok(query)
}

#[test]
fn select_record_at_capacity() -> Result<(), Box<dyn Error>> {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let ctx = Context::new(1);
    let encoder = ctx.string_encoder();
    assert_eq!(encoder.capacity(), 9728);

    let record = random_bytes(&mut rng, 9728);
    let pt = encoder.encode(&record)?;

    let selection = Plaintext::try_encode(&[1u64] as &[u64], Encoding::poly(), ctx.parameters())?;
    let mut ct = ctx.encrypt_plaintext(&selection)?;
    ctx.evaluator().multiply_plain_inplace(&mut ct, &pt)?;

    let response = ctx.serialize(&ct);
    let decrypted = ctx.decrypt_ciphertext(&ctx.deserialize(&response)?)?;
    let result = encoder.decode(&decrypted)?;
    assert_eq!(&result[..record.len()], &record);

    let e = encoder.encode(&random_bytes(&mut rng, 9729)).unwrap_err();
    assert_eq!(e.code(), ErrorCode::InvalidArgument);
    Ok(())
}

#[test]
fn retrieve_across_contexts() -> Result<(), Box<dyn Error>> {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let database = (0..4)
        .map(|_| random_bytes(&mut rng, 1000))
        .collect::<Vec<_>>();

    // The server only learns the parameters chosen by the client.
    let client = Context::new(database.len());
    let server = Context::from_parameters_bytes(&client.serialize_parameters(), database.len())?;
    assert_eq!(server.database_size(), client.database_size());

    let encoded_database = database
        .iter()
        .map(|record| server.string_encoder().encode(record))
        .collect::<fhe_pir::Result<Vec<_>>>()?;

    for index in [0, 3] {
        let query = selection_vector(&client, database.len(), index)?;

        let cts = query
            .iter()
            .map(|bytes| server.deserialize(bytes))
            .collect::<fhe_pir::Result<Vec<_>>>()?;
        let response = server.serialize(&server.evaluator().dot_product(&cts, &encoded_database)?);

        let pt = client.decrypt_ciphertext(&client.deserialize(&response)?)?;
        let result = client.string_encoder().decode(&pt)?;
        assert_eq!(&result[..1000], &database[index]);
        assert!(result[1000..].iter().all(|b| *b == 0));
    }

    Ok(())
}

#[test]
fn batched_values_across_contexts() -> Result<(), Box<dyn Error>> {
    let config = ContextConfigBuilder::new().set_degree(2048).build()?;
    let client = Context::with_config(&config, 8)?;
    let server = Context::from_parameters_bytes(&client.serialize_parameters(), 8)?;

    let values = (0..client.slot_count() as u64).collect::<Vec<_>>();
    let offsets = vec![7u64; server.slot_count()];

    let ct = server.deserialize(&client.encrypt(&values)?)?;
    let ct = server.evaluator().add_plain(&ct, &server.encode(&offsets)?)?;
    let result = client.decrypt(&server.serialize(&ct))?;

    let expected = values.iter().map(|v| v + 7).collect::<Vec<_>>();
    assert_eq!(result, expected);
    Ok(())
}

#[test]
fn padding_is_deterministic() -> Result<(), Box<dyn Error>> {
    let ctx = Context::new(1);
    let encoder = ctx.string_encoder();
    let first = encoder.decode(&encoder.encode(&[])?)?;
    let second = encoder.decode(&encoder.encode(&[])?)?;
    assert_eq!(first, second);
    assert_eq!(first.len(), 9728);
    assert!(first.iter().all(|b| *b == 0));
    Ok(())
}

#[test]
fn strings_through_batching() -> Result<(), Box<dyn Error>> {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let ctx = Context::new(1);
    let value = random_bytes(&mut rng, 1024);

    let ct = ctx.encrypt_bytes(&value)?;
    let result = ctx.decrypt_bytes(&ct)?;
    assert_eq!(&result[..value.len()], &value);

    let e = ctx.decrypt_bytes(&ct[..ct.len() - 8]).unwrap_err();
    assert_eq!(e.code(), ErrorCode::InvalidArgument);
    assert!(!e.message().is_empty());
    Ok(())
}
