// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-sbc-bridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! # Daemon Management Module
//!
//! This module runs the bridge front-ends as background tasks:
//!
//! - Modbus RTU server on the serial line
//! - optional Modbus TCP server
//! - web register console
//!
//! All of them share one [`InstrumentedAccessor`], created from the
//! configuration when the daemon is built.
//!
//! ## Usage
//!
//! ```no_run
//! use rust_sbc_bridge::{config::Config, daemon::launch_daemon::Daemon};
//!
//! async fn example() -> anyhow::Result<()> {
//!     let config = Config::from_file("config.yaml")?;
//!
//!     let mut daemon = Daemon::from_config(&config)?;
//!     daemon.launch(&config).await?;
//!
//!     tokio::signal::ctrl_c().await?;
//!
//!     daemon.shutdown();
//!     daemon.join().await?;
//!     Ok(())
//! }
//! ```

use std::io;
use std::net::{IpAddr, SocketAddr};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::{Context, Result};
use log::{debug, error, info, warn};
use rocket::{
    config::LogLevel,
    data::{Limits, ToByteUnit},
};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio::time;
use tokio_modbus::server::tcp::{accept_tcp_connection, Server};

use crate::config::Config;
use crate::modbus::{serial::open_serial, BridgeModbusService};
use crate::registers::{InstrumentedAccessor, LogAccessRecorder, RegisterStore};
use crate::web::build_rocket;

/// How often server supervisors check the `running` flag.
const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// How long a task may take to stop before it is reported as hung.
const STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// Coordinates the background services of the bridge
///
/// The `running` flag is shared with every Modbus server task; clearing it
/// makes them abort their server and return. The web server is stopped
/// through its Rocket [`Shutdown`](rocket::Shutdown) handle.
pub struct Daemon {
    tasks: Vec<JoinHandle<Result<()>>>,
    running: Arc<AtomicBool>,
    accessor: Arc<InstrumentedAccessor>,
    web_shutdown: Option<rocket::Shutdown>,
    modbus_tcp_addr: Option<SocketAddr>,
}

impl Daemon {
    /// Create a daemon around an existing accessor.
    pub fn new(accessor: Arc<InstrumentedAccessor>) -> Self {
        Self {
            tasks: Vec::new(),
            running: Arc::new(AtomicBool::new(true)),
            accessor,
            web_shutdown: None,
            modbus_tcp_addr: None,
        }
    }

    /// Create the register store described by `config` and a daemon serving it.
    ///
    /// Accesses are recorded with [`LogAccessRecorder`].
    ///
    /// ### Errors
    ///
    /// Fails if the register dimensions are invalid.
    pub fn from_config(config: &Config) -> Result<Self> {
        let store = RegisterStore::new(config.registers.data_points, config.registers.unit_id)
            .context("Failed to create register store")?;
        info!(
            "Register store ready: {} data points per table, unit id {}",
            store.data_points(),
            store.unit_id()
        );
        let accessor = InstrumentedAccessor::new(Arc::new(store), Arc::new(LogAccessRecorder));
        Ok(Self::new(Arc::new(accessor)))
    }

    pub fn accessor(&self) -> Arc<InstrumentedAccessor> {
        self.accessor.clone()
    }

    /// Address the Modbus TCP listener is bound to, once launched.
    pub fn modbus_tcp_addr(&self) -> Option<SocketAddr> {
        self.modbus_tcp_addr
    }

    /// Start every service enabled in `config`.
    ///
    /// Opening the serial port and binding the Modbus TCP listener happen
    /// before this returns, so their failures are reported to the caller.
    pub async fn launch(&mut self, config: &Config) -> Result<()> {
        info!("Launching daemon tasks");

        if config.serial.enabled {
            self.start_rtu_server(config)?;
        } else {
            info!("Serial RTU server disabled");
        }

        if config.modbus_tcp.enabled {
            self.start_modbus_tcp_server(config).await?;
        }

        if config.web.enabled {
            self.start_web_server(config).await?;
        } else {
            info!("Web server disabled");
        }

        if self.tasks.is_empty() {
            warn!("No front-end enabled, the register store is unreachable");
        }
        Ok(())
    }

    /// Serve Modbus RTU on the configured serial port.
    fn start_rtu_server(&mut self, config: &Config) -> Result<()> {
        info!(
            "Starting Modbus RTU server on {} for unit {}",
            config.serial.port, config.registers.unit_id
        );
        let serial = open_serial(&config.serial)?;
        let service = BridgeModbusService::new(self.accessor.clone());
        let running = self.running.clone();

        let task = tokio::spawn(async move {
            let server = tokio_modbus::server::rtu::Server::new(serial);
            let server_handle = tokio::spawn(async move { server.serve_forever(service).await });
            supervise("Modbus RTU server", running, server_handle).await
        });

        self.tasks.push(task);
        Ok(())
    }

    /// Serve the same unit over Modbus TCP.
    async fn start_modbus_tcp_server(&mut self, config: &Config) -> Result<()> {
        let ip: IpAddr = config
            .modbus_tcp
            .address
            .parse()
            .with_context(|| format!("Invalid Modbus TCP address {}", config.modbus_tcp.address))?;
        let bind_addr = SocketAddr::new(ip, config.modbus_tcp.port);
        let listener = TcpListener::bind(bind_addr)
            .await
            .with_context(|| format!("Failed to bind Modbus TCP listener on {bind_addr}"))?;
        let local_addr = listener.local_addr()?;
        info!("Starting Modbus TCP server on {}", local_addr);
        self.modbus_tcp_addr = Some(local_addr);

        let service = BridgeModbusService::new(self.accessor.clone());
        let running = self.running.clone();

        let task = tokio::spawn(async move {
            let server = Server::new(listener);

            // One service value per connection, all sharing the same accessor
            let on_connected = move |stream, socket_addr| {
                let service = service.clone();
                async move {
                    debug!("Modbus TCP client connected from {socket_addr}");
                    accept_tcp_connection(stream, socket_addr, move |_socket_addr| {
                        Ok(Some(service.clone()))
                    })
                }
            };
            let on_process_error = |err| {
                error!("Modbus TCP server error: {err}");
            };

            let server_handle =
                tokio::spawn(async move { server.serve(&on_connected, on_process_error).await });
            supervise("Modbus TCP server", running, server_handle).await
        });

        self.tasks.push(task);
        Ok(())
    }

    /// Start the Rocket web server.
    async fn start_web_server(&mut self, config: &Config) -> Result<()> {
        info!(
            "Starting web server on {}:{}",
            config.web.address, config.web.port
        );

        let figment = rocket::Config::figment()
            .merge(("ident", config.web.name.clone()))
            .merge(("limits", Limits::new().limit("bytes", 64.kibibytes())))
            .merge(("address", config.web.address.clone()))
            .merge(("port", config.web.port))
            .merge(("log_level", LogLevel::Normal))
            .merge(("shutdown.ctrlc", false));

        let rocket = build_rocket(figment, self.accessor.clone())
            .ignite()
            .await
            .context("Failed to configure web server")?;
        self.web_shutdown = Some(rocket.shutdown());

        let task = tokio::spawn(async move {
            rocket.launch().await?;
            info!("Web server stopped");
            Ok(())
        });

        self.tasks.push(task);
        Ok(())
    }

    /// Ask every task to stop.
    ///
    /// Returns immediately; use [`Daemon::join`] to wait for the tasks.
    pub fn shutdown(&self) {
        info!("Shutting down daemon tasks");
        if let Some(shutdown) = &self.web_shutdown {
            shutdown.clone().notify();
        }
        self.running.store(false, Ordering::SeqCst);
    }

    /// Wait for all tasks to complete
    ///
    /// Task failures and panics are logged. A task still running after the
    /// stop timeout is reported and left behind.
    pub async fn join(self) -> Result<()> {
        for task in self.tasks {
            match time::timeout(STOP_TIMEOUT, task).await {
                Ok(Ok(Ok(()))) => {}
                Ok(Ok(Err(e))) => error!("Task failed: {:#}", e),
                Ok(Err(e)) => error!("Task panicked: {}", e),
                Err(_) => warn!("Task did not complete within timeout period, may be hung"),
            }
        }
        Ok(())
    }
}

/// Watch a server task until it ends or the `running` flag is cleared.
async fn supervise(
    name: &'static str,
    running: Arc<AtomicBool>,
    mut server: JoinHandle<io::Result<()>>,
) -> Result<()> {
    while running.load(Ordering::SeqCst) {
        tokio::select! {
            result = &mut server => {
                return match result {
                    Ok(Ok(())) => {
                        info!("{name} stopped");
                        Ok(())
                    }
                    Ok(Err(e)) => Err(e).with_context(|| format!("{name} failed")),
                    Err(e) => Err(e).with_context(|| format!("{name} task failed")),
                };
            }
            _ = time::sleep(POLL_INTERVAL) => {}
        }
    }

    info!("Shutting down {name}...");
    server.abort();
    match time::timeout(STOP_TIMEOUT, server).await {
        Ok(_) => info!("{name} shut down successfully"),
        Err(_) => warn!("{name} shutdown timed out, forcing termination"),
    }
    Ok(())
}
