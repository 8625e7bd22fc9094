//! # MQTT Bridge Module
//!
//! Keeps one persistent broker session alive and connects it to the local
//! device: status telemetry goes out on two independent schedules, commands
//! come in on a wildcard subscription and are routed to the actuator.
//!
//! ## Module Architecture
//!
//! ```text
//! mqtt/
//! ├── backoff.rs          - Reconnect pacing after a lost session
//! ├── config.rs           - Broker identity, topic prefixes and fixed timings
//! ├── dispatcher.rs       - Command topic routing and payload validation
//! ├── error.rs            - Transport error kinds
//! ├── message_manager.rs  - Inbound command message representation
//! ├── mqtt_handler.rs     - Connection supervisor state machine
//! ├── publish_loop.rs     - Periodic status publishing
//! └── transport.rs        - Transport traits and the rumqttc implementation
//! ```
//!
//! ## Wire Topics
//!
//! | direction | topic                 | payload                      |
//! |-----------|-----------------------|------------------------------|
//! | in        | `<sub_topic>#`        | see [`dispatcher`]           |
//! | out       | `<pub_topic>volume`   | current level, every 5s      |
//! | out       | `<pub_topic>online`   | `true` every 30s             |
//! | will      | `<pub_topic>online`   | `false`, retained            |
//!
//! Commands are subscribed at QoS 1, status is published at QoS 0 and the
//! last will goes out at QoS 2.
//!
//! ## Failure Policy
//!
//! Nothing here is fatal. Connect failures are retried forever, provider
//! and publish failures skip one cycle, malformed commands are skipped and
//! a lost session is recovered by the transport's reconnect.

pub mod backoff;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod message_manager;
pub mod mqtt_handler;
pub mod publish_loop;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;
