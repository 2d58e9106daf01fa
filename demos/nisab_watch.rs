//! Prints live metal prices, Nisab and Zakat due.
//!
//! Usage: `cargo run --example nisab_watch -- [CURRENCY] [ASSETS] [DEBTS]`

use nisab_price_sdk::zakat::{
    assess, format_amount, Currency, LocalMetalPrices, NisabThreshold, ZakatInputs,
    ZakatableAssets,
};
use nisab_price_sdk::{MetalPriceTracker, PriceConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let mut args = std::env::args().skip(1);
    let code = args.next().unwrap_or_else(|| "INR".to_string());
    let assets: f64 = args.next().map(|a| a.parse::<f64>()).transpose()?.unwrap_or(0.0);
    let debts: f64 = args.next().map(|a| a.parse::<f64>()).transpose()?.unwrap_or(0.0);
    let symbol = Currency::find(&code).map(|c| c.symbol).unwrap_or("$");

    let tracker = MetalPriceTracker::new(PriceConfig::from_env()?)?;
    println!("Providers: {}", tracker.provider_names().join(" → "));

    let mut updates = tracker.subscribe();
    let refresh = tracker.start();

    let snapshot = updates.wait_for(|s| !s.is_loading).await?.clone();
    println!("Source: {}", snapshot.source);
    if let Some(advisory) = &snapshot.error {
        println!("Note:   {}", advisory);
    }

    let prices = LocalMetalPrices::from_snapshot(&snapshot, tracker.converter(), &code);
    if let Some(gold) = prices.gold_per_gram {
        println!("Gold:   {}/g", format_amount(gold, symbol));
    }
    if let Some(silver) = prices.silver_per_gram {
        println!("Silver: {}/g", format_amount(silver, symbol));
    }

    let nisab = NisabThreshold::from_prices(&prices);
    let assessment = assess(
        &ZakatInputs {
            assets: ZakatableAssets {
                cash: assets,
                ..Default::default()
            },
            debts,
        },
        &nisab,
    );

    if let Some(threshold) = assessment.nisab {
        println!("Nisab ({}): {}", code, format_amount(threshold, symbol));
    }
    println!("Net wealth: {}", format_amount(assessment.net_wealth, symbol));
    if assessment.obligatory {
        println!("Zakat due:  {}", format_amount(assessment.zakat_due, symbol));
    } else {
        println!("Net wealth is below Nisab. No Zakat is due.");
    }

    refresh.stop().await;
    Ok(())
}
