use crate::core::{ModelError, Result, Value};
use crate::model::{AttributeOptions, AttributeRegistry, Model, Persistable};
use crate::relationship::{
    Cardinality, RelationshipBinding, RelationshipContext, RelationshipSource, SessionProvider,
    with_open_session,
};
use lazy_static::lazy_static;
use log::debug;
use std::rc::{Rc, Weak};

lazy_static! {
    static ref VRDP_SERVER: AttributeRegistry = AttributeRegistry::new("VRDPServer")
        .declare("enabled", AttributeOptions::new().boolean())
        .and_then(|r| r.declare("ports", AttributeOptions::new()))
        .and_then(|r| r.declare("net_address", AttributeOptions::new()))
        .and_then(|r| r.declare("auth_type", AttributeOptions::new()))
        .and_then(|r| r.declare("auth_timeout", AttributeOptions::new()))
        .and_then(|r| r.declare("allow_multi_connection", AttributeOptions::new().boolean()))
        .and_then(|r| r.declare("reuse_single_connection", AttributeOptions::new().boolean()))
        .unwrap_or_else(|err| panic!("failed to declare VRDPServer: {}", err));
}

/// Remote display settings of a virtual machine.
///
/// Saved through a session on the owning machine, which is held weakly.
#[derive(Clone)]
pub struct VrdpServer {
    model: Model,
    parent: Option<Weak<dyn SessionProvider>>,
}

impl std::fmt::Debug for VrdpServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VrdpServer")
            .field("model", &self.model)
            .field("attached", &self.parent().is_ok())
            .finish()
    }
}

impl VrdpServer {
    pub const FIELD: &'static str = "vrdp_server";
    pub const MARKER: &'static str = "RemoteDisplay";

    pub fn new(parent: Option<Weak<dyn SessionProvider>>) -> Self {
        Self {
            model: Model::new(&VRDP_SERVER),
            parent,
        }
    }

    pub fn registry() -> &'static AttributeRegistry {
        &VRDP_SERVER
    }

    pub fn binding() -> RelationshipBinding<Self> {
        RelationshipBinding {
            field: Self::FIELD,
            marker: Self::MARKER,
            cardinality: Cardinality::One,
            renames: &[("port", "ports")],
            attach: |context| VrdpServer::new(context.parent.clone()),
        }
    }

    pub fn populate_relationship(
        context: &RelationshipContext,
        source: RelationshipSource<'_>,
    ) -> Result<Self> {
        let populated = Self::binding().populate(context, source)?;
        populated.into_one().ok_or_else(|| {
            ModelError::ParseError(format!("expected a single '{}'", Self::FIELD))
        })
    }

    /// Saves through the owning machine's session.
    pub fn save_relationship(&mut self, raise_on_error: bool) -> Result<bool> {
        Self::binding().persist(self, raise_on_error)
    }

    fn parent(&self) -> Result<Rc<dyn SessionProvider>> {
        self.parent
            .as_ref()
            .and_then(Weak::upgrade)
            .ok_or_else(|| ModelError::DetachedRelationship {
                entity: self.model.entity().to_string(),
            })
    }

    /// Pushes `payload` onto the machine's `vrdp_server` sub-handle in one session.
    fn push(&self, payload: Vec<(&'static str, &Value)>) -> Result<()> {
        let parent = self.parent()?;
        let written = with_open_session(&*parent, |machine| {
            let settings = machine.child_mut(Self::FIELD)?;
            for (name, value) in &payload {
                settings.set(name, (*value).clone())?;
            }
            Ok(payload.len())
        })?;
        debug!("VRDPServer: wrote {} setting(s)", written);
        Ok(())
    }

    pub fn is_enabled(&self) -> bool {
        self.model.flag("enabled").unwrap_or(false)
    }

    pub fn set_enabled(&mut self, enabled: bool) -> Result<()> {
        self.model.write("enabled", enabled)
    }

    /// Port list as configured, e.g. `3389` or `5000-5050`.
    pub fn ports(&self) -> Option<String> {
        self.display("ports")
    }

    pub fn set_ports(&mut self, ports: impl Into<Value>) -> Result<()> {
        self.model.write("ports", ports)
    }

    pub fn net_address(&self) -> Option<String> {
        self.display("net_address")
    }

    pub fn set_net_address(&mut self, address: impl Into<String>) -> Result<()> {
        self.model.write("net_address", address.into())
    }

    pub fn auth_type(&self) -> Option<String> {
        self.display("auth_type")
    }

    pub fn set_auth_type(&mut self, auth_type: impl Into<String>) -> Result<()> {
        self.model.write("auth_type", auth_type.into())
    }

    pub fn auth_timeout(&self) -> Option<i64> {
        self.model.read("auth_timeout").ok().and_then(Value::as_i64)
    }

    pub fn set_auth_timeout(&mut self, millis: i64) -> Result<()> {
        self.model.write("auth_timeout", millis)
    }

    pub fn allows_multi_connection(&self) -> bool {
        self.model.flag("allow_multi_connection").unwrap_or(false)
    }

    pub fn set_allow_multi_connection(&mut self, allow: bool) -> Result<()> {
        self.model.write("allow_multi_connection", allow)
    }

    pub fn reuses_single_connection(&self) -> bool {
        self.model.flag("reuse_single_connection").unwrap_or(false)
    }

    pub fn set_reuse_single_connection(&mut self, reuse: bool) -> Result<()> {
        self.model.write("reuse_single_connection", reuse)
    }

    fn display(&self, name: &str) -> Option<String> {
        self.model
            .read(name)
            .ok()
            .filter(|value| !value.is_null())
            .map(Value::to_string)
    }
}

impl Persistable for VrdpServer {
    fn model(&self) -> &Model {
        &self.model
    }

    fn model_mut(&mut self) -> &mut Model {
        &mut self.model
    }

    fn create_record(&mut self) -> Result<()> {
        self.push(self.model.full_payload())
    }

    fn update_record(&mut self) -> Result<()> {
        self.push(self.model.dirty_payload())
    }

    fn destroy_record(&mut self) -> Result<()> {
        Err(ModelError::UnsupportedOperation {
            entity: self.model.entity().to_string(),
            operation: "destroy".to_string(),
        })
    }
}
