//! Memoized contract handles over the read connection or the signing session.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use tl_chain_client::{AbiSet, ContractHandle, ContractKind, RpcTransport};
use tl_types::Address;
use tracing::debug;

use crate::error::DappError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct BindingKey {
    address: Address,
    kind: ContractKind,
    as_signer: bool,
}

#[derive(Clone)]
struct Signer {
    transport: Rc<dyn RpcTransport>,
    account: Address,
}

pub struct Bindings {
    abis: AbiSet,
    network: Rc<dyn RpcTransport>,
    signer: RefCell<Option<Signer>>,
    memo: RefCell<HashMap<BindingKey, ContractHandle>>,
}

impl Bindings {
    pub fn new(abis: AbiSet, network: Rc<dyn RpcTransport>) -> Self {
        Self {
            abis,
            network,
            signer: RefCell::new(None),
            memo: RefCell::new(HashMap::new()),
        }
    }

    pub fn abis(&self) -> &AbiSet {
        &self.abis
    }

    /// Reads go through the wallet once a session exists, else the network connection.
    pub fn reader(&self) -> Rc<dyn RpcTransport> {
        match self.signer.borrow().as_ref() {
            Some(signer) => signer.transport.clone(),
            None => self.network.clone(),
        }
    }

    pub fn attach_signer(&self, transport: Rc<dyn RpcTransport>, account: Address) {
        *self.signer.borrow_mut() = Some(Signer { transport, account });
        self.memo.borrow_mut().clear();
    }

    pub fn detach_signer(&self) {
        *self.signer.borrow_mut() = None;
        self.memo.borrow_mut().clear();
    }

    pub fn bind(
        &self,
        address: Address,
        kind: ContractKind,
        as_signer: bool,
    ) -> Result<ContractHandle, DappError> {
        let key = BindingKey {
            address,
            kind,
            as_signer,
        };
        if let Some(handle) = self.memo.borrow().get(&key) {
            return Ok(handle.clone());
        }

        let abi = self.abis.get(kind)?;
        let handle = if as_signer {
            let signer = self
                .signer
                .borrow()
                .clone()
                .ok_or_else(|| DappError::validation("Connect wallet first"))?;
            ContractHandle::new(address, kind, abi, signer.transport, Some(signer.account))
        } else {
            ContractHandle::new(address, kind, abi, self.reader(), None)
        };

        debug!("bound {} at {:#x} (signer: {})", kind, address, as_signer);
        self.memo.borrow_mut().insert(key, handle.clone());
        Ok(handle)
    }

    #[cfg(test)]
    pub(crate) fn memoized(&self) -> usize {
        self.memo.borrow().len()
    }
}
