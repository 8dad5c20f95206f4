use axum::Json;
use envoke::{envoke_client, BoundArgs, Dispatcher, MethodBinding, Server, StaticConfig};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::task;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Serialize, Deserialize)]
pub struct Forecast {
    city: String,
    high: i32,
}

envoke_client! {
    pub struct WeatherClient for "IWeather" {
        fn get_forecast as "GetForecast"(city: String) -> Forecast;
    }
}

async fn get_forecast(args: BoundArgs) -> Json<Forecast> {
    let city = args.get::<String>("city").unwrap_or_default();
    Json(Forecast { city, high: 21 })
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")))
        .init();

    let server = Server::new().method(
        "Weather",
        "GetForecast",
        MethodBinding::new().param::<String>("city"),
        get_forecast,
    );
    task::spawn(server.serve_tcp(8888));
    tokio::time::sleep(Duration::from_secs_f32(0.01)).await;

    let config = StaticConfig::new().with("Endpoints:Weather", "http://127.0.0.1:8888");
    let weather = WeatherClient::new(Dispatcher::new(config));
    let forecast = weather.get_forecast("Paris".into()).await.unwrap();
    println!("{forecast:?}");
}
