use stress_test::{stress_test_list, stress_test_scaling, stress_test_sorted_set};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async_main())?;
    Ok(())
}

async fn async_main() -> tessera_multimap::Result<()> {
    println!("\n\n╔════════════════════════════════════════════════════════════╗");
    println!("║            CONCURRENT MUTATION STRESS TESTS                 ║");
    println!("╚════════════════════════════════════════════════════════════╝");

    // Sorted sets, small then medium
    stress_test_sorted_set(4, 200, 8).await?.print();
    stress_test_sorted_set(8, 1000, 16).await?.print();

    // Lists
    stress_test_list(4, 200, 4).await?.print();
    stress_test_list(8, 1000, 8).await?.print();

    println!("\n\n╔════════════════════════════════════════════════════════════╗");
    println!("║          SCALING ANALYSIS (sorted set)                      ║");
    println!("╚════════════════════════════════════════════════════════════╝");
    stress_test_scaling(16, 4).await?;

    println!("\n✓ All stress tests completed");
    Ok(())
}
