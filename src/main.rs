//! # Server Bench - Entry Point
//! src/main.rs
//!
//! Levanta una o las tres disciplinas y las detiene al presionar Enter.

use clap::Parser;
use server_bench::config::ServerConfig;
use server_bench::server::{Server, ServerState};
use std::io::{self, BufRead};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{error, info};

type Running = (Arc<Server>, JoinHandle<server_bench::Result<()>>);

fn main() {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .with_env_filter(
            match tracing_subscriber::EnvFilter::try_from_default_env() {
                Ok(filter) => filter,
                Err(_) => tracing_subscriber::EnvFilter::new("info"),
            },
        )
        .init();

    let config = ServerConfig::parse();
    if let Err(e) = config.validate() {
        eprintln!("{}", e);
        std::process::exit(1);
    }

    println!("=================================");
    println!("  Server Bench");
    println!("=================================\n");
    println!("Configuración:");
    println!("   Host: {}", config.host);
    println!("   Pool size: {}", config.pool_size);
    println!("   Service time: {}ms", config.service_ms);
    println!();

    let mut running: Vec<Running> = Vec::new();
    for endpoint in config.endpoints() {
        let discipline = endpoint.discipline;
        let address = &endpoint.address;
        let server = Arc::new(Server::new(discipline, address.clone(), config.timing()));

        let runner = Arc::clone(&server);
        let spawned = thread::Builder::new()
            .name(endpoint.thread_name())
            .spawn(move || runner.start());
        let handle = match spawned {
            Ok(handle) => handle,
            Err(e) => {
                error!(%discipline, error = %e, "failed to spawn acceptor thread");
                continue;
            }
        };

        match wait_until_listening(&server, handle) {
            Some(handle) => {
                println!("Started {} on {}", discipline, address);
                running.push((server, handle));
            }
            None => error!(%discipline, %address, "server did not start"),
        }
    }

    if running.is_empty() {
        eprintln!("No server could be started");
        std::process::exit(1);
    }

    println!("\nServers started. Press Enter to stop.");
    let mut line = String::new();
    match io::stdin().lock().read_line(&mut line) {
        Ok(0) => {
            // Sin stdin (proceso en background): seguir hasta que lo maten
            info!("stdin closed, serving until terminated");
            for (_, handle) in running {
                let _ = handle.join();
            }
            return;
        }
        Ok(_) => {}
        Err(e) => error!(error = %e, "failed to read stdin, stopping"),
    }

    for (server, handle) in running {
        server.stop();
        match handle.join() {
            Ok(Ok(())) => println!("{} stopped.", server.discipline()),
            Ok(Err(e)) => error!(discipline = %server.discipline(), error = %e, "server exited with error"),
            Err(_) => error!(discipline = %server.discipline(), "acceptor thread panicked"),
        }
    }
}

/// Espera a que el servidor quede en Running. Si `start()` termina antes
/// (p.ej. puerto ocupado), registra el error y retorna `None`.
fn wait_until_listening(
    server: &Server,
    handle: JoinHandle<server_bench::Result<()>>,
) -> Option<JoinHandle<server_bench::Result<()>>> {
    loop {
        if server.wait_for_state(ServerState::Running, Duration::from_millis(100)) {
            return Some(handle);
        }
        if handle.is_finished() {
            match handle.join() {
                Ok(Err(e)) => error!(error = %e, "failed to start server"),
                Ok(Ok(())) => {}
                Err(_) => error!("acceptor thread panicked"),
            }
            return None;
        }
    }
}
