//! Connects to a system monitor, binds its metrics onto an in-memory page and
//! prints the page state whenever it changes.
//!
//! Run with tracing enabled:
//! ```sh
//! RUST_LOG=info,dashboard_ws=debug cargo run --example dashboard --features tracing -- ws://127.0.0.1:8000/ws
//! ```
//!
//! Optionally log to a file:
//! ```sh
//! LOG_FILE=dashboard.log RUST_LOG=debug cargo run --example dashboard --features tracing
//! ```

use std::fs::File;
use std::sync::{Arc, Mutex};

use dashboard_ws::binding::{ElementId, MemoryDocument, SharedDocument};
use dashboard_ws::{Client, Config, topic};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

struct Page {
    cpu_text: ElementId,
    cpu_bar: ElementId,
    temp_text: ElementId,
    temp_bar: ElementId,
    ram_text: ElementId,
    uptime: ElementId,
}

fn build_page(document: &mut MemoryDocument) -> Page {
    let root = document.root();

    let fast = document.element(root, "section", &[("data-ws-topic", topic::FAST_INFO)]);
    let cpu_text = document.element(fast, "span", &[("data-ws-field", "cpu_usage")]);
    let cpu_bar = document.element(
        fast,
        "div",
        &[
            ("class", "progress-bar progress-bar-cpu"),
            ("data-ws-field", "cpu_usage"),
        ],
    );
    let temp_text = document.element(fast, "span", &[("data-ws-field", "cpu_temp")]);
    let temp_bar = document.element(
        fast,
        "div",
        &[
            ("class", "progress-bar progress-bar-temp"),
            ("data-ws-field", "cpu_temp_percent"),
            ("data-ws-class", "temp_class"),
        ],
    );

    let slow = document.element(root, "section", &[("data-ws-topic", topic::SLOW_INFO)]);
    let ram_text = document.element(slow, "span", &[("data-ws-field", "ram_percent")]);
    let uptime = document.element(slow, "span", &[("data-ws-field", "uptime")]);

    Page {
        cpu_text,
        cpu_bar,
        temp_text,
        temp_bar,
        ram_text,
        uptime,
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Ok(path) = std::env::var("LOG_FILE") {
        let file = File::create(path)?;
        tracing_subscriber::registry()
            .with(EnvFilter::from_default_env())
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(file)
                    .with_ansi(false),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(EnvFilter::from_default_env())
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    let address = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "ws://127.0.0.1:8000/ws".to_owned());

    let document = Arc::new(Mutex::new(MemoryDocument::new()));
    let page = build_page(&mut document.lock().map_err(|e| anyhow::anyhow!("{e}"))?);
    let surface: SharedDocument = document.clone();

    let client = Client::builder()
        .address(address)
        .topics(vec![
            topic::STATIC_INFO.to_owned(),
            topic::FAST_INFO.to_owned(),
            topic::SLOW_INFO.to_owned(),
        ])
        .config(Config::default())
        .surface(surface)
        .build();

    client.on_connect(|event| {
        info!(url = %event.url, at = %event.at, "connected");
        Ok(())
    });
    client.on_disconnect(|event| {
        warn!(code = ?event.code, reason = %event.reason, "disconnected");
        Ok(())
    });

    let page_document = Arc::clone(&document);
    client.on_message(move |message| {
        if message.topic.as_deref() == Some(topic::STATIC_INFO) {
            if let Some(os) = message.field("os_name") {
                info!(os = %os, "host");
            }
            return Ok(());
        }

        let d = page_document.lock().map_err(|e| e.to_string())?;
        info!(
            cpu = d.text(page.cpu_text),
            cpu_fill = ?d.style_property(page.cpu_bar, "--fill-percent"),
            temp = d.text(page.temp_text),
            temp_classes = ?d.classes(page.temp_bar),
            ram = d.text(page.ram_text),
            uptime = d.text(page.uptime),
            "page"
        );
        Ok(())
    });

    let mut errors = client.errors();
    client.connect();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            report = errors.recv() => match report {
                Ok(e) => error!(error = %e, "client error"),
                Err(e) => warn!(error = %e, "error channel lagged"),
            },
        }
    }

    client.disconnect();
    Ok(())
}
