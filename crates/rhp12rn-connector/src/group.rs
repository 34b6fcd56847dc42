//! Bulk status reads.

use crate::telemetry::metric_defs;
use crate::{Connection, ConnectorError, Result};
use rhp12rn_control_table::GroupValues;
use rhp12rn_transport::Bus;
use tracing::{trace, warn};

impl<B: Bus> Connection<B> {
    /// Read the installed group layout in a single transaction.
    ///
    /// Pending single-field requests are drained first so the bulk response
    /// cannot be confused with a queued one. The bulk range is registered with
    /// the port on first use after each connect.
    pub fn group_read(&mut self) -> Result<GroupValues> {
        if !self.connected() {
            return Err(ConnectorError::NotConnected);
        }
        let model_number = self.model_number();
        let layout = match self.group_layout() {
            Some(layout) if Some(layout.model_number) == model_number => layout.clone(),
            _ => return Err(ConnectorError::UnsupportedDevice { model_number }),
        };

        let drained = self.flush();
        if drained > 0 {
            trace!(drained, "drained pending requests before bulk read");
        }

        let outcome = self
            .bulk_transaction(layout.base_address, layout.length)
            .and_then(|response| {
                if !response.status.is_ok() {
                    return Err(ConnectorError::Device(response.status));
                }
                layout
                    .decode(&response.data)
                    .map_err(|err| ConnectorError::from_table("group", err))
            });

        let label = match &outcome {
            Ok(_) => "ok",
            Err(ConnectorError::Device(status)) => {
                warn!(%status, "bulk read device error");
                "device_error"
            }
            Err(_) => "comm_error",
        };
        metrics::counter!(metric_defs::BULK_READS.name, "outcome" => label).increment(1);
        outcome
    }
}
