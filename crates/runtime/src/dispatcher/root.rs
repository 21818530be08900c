use std::sync::Arc;

use pw_dispatch_protocol::ROOT_GUID;

use super::{Dispatcher, ParentOrConnection};
use crate::connection::Connection;

/// Protocol type of the root scope.
pub const ROOT_TYPE: &str = "";

/// Domain value behind the root scope; it has no behaviour of its own.
#[derive(Debug, Default)]
pub struct Root;

/// Creates the parentless root scope anchoring a connection's tree.
///
/// The root has no parent, so no `__create__` is ever sent for it.
pub(crate) fn create_root(connection: &Arc<Connection>) -> Arc<Dispatcher> {
    Dispatcher::builder(ROOT_TYPE)
        .scope()
        .guid(ROOT_GUID)
        .create(
            ParentOrConnection::Connection(Arc::clone(connection)),
            Arc::new(Root),
        )
}
