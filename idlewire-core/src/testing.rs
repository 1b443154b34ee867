//! Host-side stand-ins for the transmit peripheral

use std::vec::Vec;

use idlewire_hal::{DmaTx, TransferError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockTxError;

/// Records every transfer it is asked to start
#[derive(Debug, Default)]
pub struct MockTx {
    transfers: Vec<Vec<u8>>,
    busy: bool,
    fail_next: bool,
}

impl MockTx {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `begin_transfer` fail with a peripheral error
    pub fn fail_next(&mut self) {
        self.fail_next = true;
    }

    /// Hardware side of the completion interrupt
    pub fn finish(&mut self) {
        self.busy = false;
    }

    pub fn transfers(&self) -> &[Vec<u8>] {
        &self.transfers
    }
}

impl DmaTx for MockTx {
    type Error = MockTxError;

    fn begin_transfer(&mut self, data: &[u8]) -> Result<(), TransferError<MockTxError>> {
        if self.fail_next {
            self.fail_next = false;
            return Err(TransferError::Peripheral(MockTxError));
        }
        if self.busy {
            return Err(TransferError::Busy);
        }
        self.busy = true;
        self.transfers.push(data.to_vec());
        Ok(())
    }

    fn is_busy(&self) -> bool {
        self.busy
    }
}
