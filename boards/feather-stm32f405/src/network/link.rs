#![deny(unsafe_code)]
#![deny(warnings)]
//! Ethernet link readiness

use defmt::info;
use embassy_net::Stack;
use embassy_time::{with_timeout, Duration};
use hal_abstractions::{LinkError, NetworkLink};

/// W5500 Ethernet link with a DHCP lease
pub struct EthernetLink {
    stack: Stack<'static>,
    dhcp_wait: Duration,
}

impl EthernetLink {
    pub fn new(stack: Stack<'static>, dhcp_wait_ms: u64) -> Self {
        Self {
            stack,
            dhcp_wait: Duration::from_millis(dhcp_wait_ms),
        }
    }

    fn log_config(&self) {
        if let Some(config) = self.stack.config_v4() {
            let octets = config.address.address().octets();
            info!("IP: {}.{}.{}.{}", octets[0], octets[1], octets[2], octets[3]);

            if let Some(gateway) = config.gateway {
                let gw = gateway.octets();
                info!("Gateway: {}.{}.{}.{}", gw[0], gw[1], gw[2], gw[3]);
            }
        }
    }
}

impl NetworkLink for EthernetLink {
    async fn connect(&mut self) -> Result<(), LinkError> {
        with_timeout(self.dhcp_wait, self.stack.wait_link_up())
            .await
            .map_err(|_| LinkError::NotAssociated)?;
        info!("Waiting for DHCP...");
        with_timeout(self.dhcp_wait, self.stack.wait_config_up())
            .await
            .map_err(|_| LinkError::AddressPending)?;
        info!("Network is UP!");
        self.log_config();
        Ok(())
    }
}
