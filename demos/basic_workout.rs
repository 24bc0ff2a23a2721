use solelink::{Result, SexType, Treadmill};
use std::{env, process, time::Duration};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let address = env::args().nth(1).unwrap_or_else(|| {
        eprintln!("usage: basic_workout <bluetooth-address>");
        process::exit(2);
    });

    info!("connecting to treadmill at {address}");
    let treadmill = Treadmill::new(&address)?;

    if let Err(e) = treadmill.connect(&CancellationToken::new()).await {
        error!("failed to connect: {e}");
        return Err(e);
    }

    let info = treadmill.get_device_info().await?;
    println!("connected: {info:?}");

    treadmill.add_listener(|event| match event {
        Ok(msg) => println!("<- {msg}"),
        Err(err) => eprintln!("!! {err}"),
    });

    treadmill
        .set_user_profile(SexType::Male, 30, 155, 72)
        .await?;
    treadmill.set_workout_time(Duration::from_secs(20 * 60)).await?;

    info!("starting workout (the console will drop and re-establish the link)");
    treadmill.start_workout().await?;
    info!("workout running");

    // Let telemetry stream for a minute, then bump the level once.
    tokio::time::sleep(Duration::from_secs(30)).await;
    treadmill.level_up().await?;
    tokio::time::sleep(Duration::from_secs(30)).await;

    treadmill.close().await?;
    info!("disconnected");

    Ok(())
}
