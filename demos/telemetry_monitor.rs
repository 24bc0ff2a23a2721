use solelink::{Message, Result, Treadmill};
use std::{env, process};
use tokio_util::sync::CancellationToken;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let address = env::args().nth(1).unwrap_or_else(|| {
        eprintln!("usage: telemetry_monitor <bluetooth-address>");
        process::exit(2);
    });

    let treadmill = Treadmill::new(&address)?;
    treadmill.connect(&CancellationToken::new()).await?;

    let info = treadmill.get_device_info().await?;
    println!("watching {info:?}");
    println!("press Ctrl+C to stop");

    treadmill.add_listener(|event| match event {
        Ok(Message::WorkoutData(data)) => {
            println!(
                "{:02}:{:02}  speed={:<3} incline={:<2} hr={:<3} dist={:<5} kcal={}",
                data.minute, data.second, data.speed, data.incline, data.heart_rate,
                data.distance, data.calories,
            );
        }
        Ok(Message::ErrorCode { code }) => eprintln!("console error code {code}"),
        Ok(Message::EndWorkout(end)) => {
            println!(
                "workout finished: {}s, distance {}, {} kcal",
                end.seconds, end.distance, end.calories
            );
        }
        Ok(_) => {}
        Err(err) => eprintln!("decode error: {err}"),
    });

    tokio::signal::ctrl_c().await?;

    info!("shutting down");
    treadmill.close().await?;

    Ok(())
}
