use crate::core::{ModelError, OutcomeExt, Result, Value};
use crate::gateway::ResourceGateway;
use crate::model::{AttributeOptions, AttributeRegistry, Model, Persistable, ValidationRule};
use crate::parser::{ParsedRecord, TextBlockParser, convert};
use crate::relationship::{
    Cardinality, Populated, RelationshipBinding, RelationshipContext, RelationshipSource,
};
use lazy_static::lazy_static;
use log::{debug, trace, warn};
use std::fmt;
use std::path::Path;
use std::rc::Rc;
use uuid::Uuid;

lazy_static! {
    static ref HARD_DRIVE: AttributeRegistry = AttributeRegistry::new("HardDrive")
        .declare("uuid", AttributeOptions::new().read_only())
        .and_then(|r| r.declare("location", AttributeOptions::new()))
        .and_then(|r| r.declare("size", AttributeOptions::new()))
        .and_then(|r| r.declare("format", AttributeOptions::new().default_value(HardDrive::DEFAULT_FORMAT)))
        .and_then(|r| r.declare("accessible", AttributeOptions::new().read_only()))
        .and_then(|r| r.declare("disk_type", AttributeOptions::new().read_only()))
        .and_then(|r| r.declare("actual_size", AttributeOptions::new().read_only()))
        .and_then(|r| r.declare("in_use_by", AttributeOptions::new().read_only()))
        .and_then(|r| r.validates(ValidationRule::Presence("format")))
        .and_then(|r| r.validates(ValidationRule::Presence("size")))
        .and_then(|r| r.validates(ValidationRule::Numeric("size")))
        .unwrap_or_else(|err| panic!("failed to declare HardDrive: {}", err));
}

/// Report keys (first present wins), attribute, converter.
///
/// `showhdinfo` and `list hdds` name size and format differently, and older
/// releases use `Size`/`Format`.
const REPORT_FIELDS: &[(&[&str], &str, fn(&str) -> String)] = &[
    (&["UUID"], "uuid", trimmed),
    (&["Location"], "location", trimmed),
    (&["Logical size", "Capacity", "Size"], "size", first_token),
    (&["Storage format", "Format"], "format", trimmed),
    (&["Accessible"], "accessible", trimmed),
    (&["Type"], "disk_type", disk_type_name),
    (&["Current size on disk"], "actual_size", first_token),
    (&["In use by VMs"], "in_use_by", vm_names),
];

/// Report spelling -> configuration file spelling of the medium type.
const DISK_TYPES: &[(&str, &str)] = &[
    ("normal", "Normal"),
    ("immutable", "Immutable"),
    ("writethrough", "Writethrough"),
    ("shareable", "Shareable"),
    ("readonly", "Readonly"),
    ("multiattach", "MultiAttach"),
];

/// Create flags, in the order the payload is declared.
const CREATE_FLAGS: &[(&str, &str)] = &[
    ("location", "--filename"),
    ("size", "--size"),
    ("format", "--format"),
];

fn trimmed(value: &str) -> String {
    value.trim().to_string()
}

fn first_token(value: &str) -> String {
    convert::leading_token(value).unwrap_or("").to_string()
}

/// `"normal (base)"` -> `"Normal"`, matching what configuration documents store.
fn disk_type_name(value: &str) -> String {
    let reported = convert::strip_parenthetical(value);
    DISK_TYPES
        .iter()
        .find(|(report, _)| report.eq_ignore_ascii_case(reported))
        .map(|(_, name)| name.to_string())
        .unwrap_or_else(|| reported.to_string())
}

/// Every VM listed, without the `(UUID: ..)` notes.
fn vm_names(value: &str) -> String {
    convert::outside_parentheses(value).join(", ")
}

/// A virtual hard drive image known to the resource manager.
#[derive(Clone)]
pub struct HardDrive {
    model: Model,
    gateway: Rc<dyn ResourceGateway>,
}

impl fmt::Debug for HardDrive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HardDrive")
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl HardDrive {
    pub const FIELD: &'static str = "hard_drives";
    pub const MARKER: &'static str = "HardDisk";
    pub const DEFAULT_FORMAT: &'static str = "VDI";

    /// A new, unsaved drive with the default format.
    pub fn new(gateway: Rc<dyn ResourceGateway>) -> Self {
        Self {
            model: Model::new(&HARD_DRIVE),
            gateway,
        }
    }

    pub fn registry() -> &'static AttributeRegistry {
        &HARD_DRIVE
    }

    /// Looks a drive up by UUID or location.
    ///
    /// A tool failure (unknown medium) gives `Ok(None)` unless
    /// `raise_on_error` is set; a successful report without a medium block is
    /// always `Ok(None)`.
    pub fn find(
        gateway: &Rc<dyn ResourceGateway>,
        id: &str,
        raise_on_error: bool,
    ) -> Result<Option<Self>> {
        Self::try_find(gateway, id).or_sentinel(raise_on_error, None)
    }

    /// Every registered drive, in listing order, read from the `list hdds`
    /// blocks. Failures always propagate.
    pub fn all(gateway: &Rc<dyn ResourceGateway>) -> Result<Vec<Self>> {
        let output = gateway.invoke("list", &["hdds".to_string()])?;
        let drives = Self::parser()
            .parse(&output)
            .iter()
            .map(|record| Self::from_record(gateway, record))
            .collect::<Result<Vec<_>>>()?;
        debug!("listed {} hard drive(s)", drives.len());
        Ok(drives)
    }

    /// Children of a parent entity, from its live handle or its configuration document.
    pub fn populate_relationship(
        context: &RelationshipContext,
        source: RelationshipSource<'_>,
    ) -> Result<Vec<Self>> {
        Self::binding().populate(context, source).map(Populated::into_many)
    }

    pub fn binding() -> RelationshipBinding<Self> {
        RelationshipBinding {
            field: Self::FIELD,
            marker: Self::MARKER,
            cardinality: Cardinality::Many,
            renames: &[("type", "disk_type")],
            attach: |context| HardDrive::new(Rc::clone(&context.gateway)),
        }
    }

    /// Copies the image to `target` and returns the registered copy.
    ///
    /// `Ok(None)` on a tool failure unless `raise_on_error` is set.
    pub fn clone_to(&self, target: &str, format: &str, raise_on_error: bool) -> Result<Option<Self>> {
        self.try_clone_to(target, format).or_sentinel(raise_on_error, None)
    }

    /// [`clone_to`](Self::clone_to) in the default `VDI` format.
    pub fn clone_to_vdi(&self, target: &str, raise_on_error: bool) -> Result<Option<Self>> {
        self.clone_to(target, Self::DEFAULT_FORMAT, raise_on_error)
    }

    fn try_clone_to(&self, target: &str, format: &str) -> Result<Option<Self>> {
        self.model.ensure_live()?;
        let args = vec![
            self.uuid_arg("clone")?,
            target.to_string(),
            "--format".to_string(),
            format.to_string(),
            "--remember".to_string(),
        ];
        let output = self.gateway.invoke("clonehd", &args)?;
        let uuid = reported_uuid("clonehd", &args, &output)?;
        Self::try_find(&self.gateway, &uuid)
    }

    fn try_find(gateway: &Rc<dyn ResourceGateway>, id: &str) -> Result<Option<Self>> {
        let output = gateway.invoke("showhdinfo", &[id.to_string()])?;
        Self::parser()
            .parse_first(&output)
            .map(|record| Self::from_record(gateway, &record))
            .transpose()
    }

    fn parser() -> TextBlockParser {
        TextBlockParser::with_marker("UUID")
    }

    fn from_record(gateway: &Rc<dyn ResourceGateway>, record: &ParsedRecord) -> Result<Self> {
        let mut drive = Self::new(Rc::clone(gateway));
        drive.model.load_with(|model| {
            for (keys, attribute, converter) in REPORT_FIELDS {
                let value = keys.iter().find_map(|key| record.get(key)).map(converter);
                model.write(attribute, Value::from(value))?;
            }
            Ok(())
        })?;
        trace!("loaded hard drive {:?}", drive.uuid());
        Ok(drive)
    }

    /// Re-reads this drive and replaces every attribute with the report.
    fn reload(&mut self, uuid: &str) -> Result<()> {
        let fresh = Self::try_find(&self.gateway, uuid)?.ok_or_else(|| {
            ModelError::command_failed("showhdinfo", &[uuid.to_string()], "medium not reported")
        })?;
        self.model = fresh.model;
        Ok(())
    }

    /// Reloads after the tool already applied a change. The change stands
    /// either way; a failed re-read only leaves the local values stale.
    fn refresh_after_change(&mut self, uuid: &str) {
        if let Err(err) = self.reload(uuid) {
            warn!("hard drive {} changed but could not be re-read: {}", uuid, err);
        }
    }

    fn uuid_arg(&self, operation: &str) -> Result<String> {
        self.uuid()
            .map(str::to_string)
            .ok_or_else(|| ModelError::UnsupportedOperation {
                entity: self.model.entity().to_string(),
                operation: format!("{} without a uuid", operation),
            })
    }

    pub fn uuid(&self) -> Option<&str> {
        self.model.text("uuid")
    }

    pub fn location(&self) -> Option<&str> {
        self.model.text("location")
    }

    pub fn set_location(&mut self, location: impl Into<String>) -> Result<()> {
        self.model.write("location", location.into())
    }

    /// Logical size in megabytes.
    pub fn size(&self) -> Option<i64> {
        self.model.read("size").ok().and_then(Value::as_i64)
    }

    pub fn set_size(&mut self, megabytes: i64) -> Result<()> {
        self.model.write("size", megabytes)
    }

    pub fn format(&self) -> Option<&str> {
        self.model.text("format")
    }

    pub fn set_format(&mut self, format: impl Into<String>) -> Result<()> {
        self.model.write("format", format.into())
    }

    pub fn is_accessible(&self) -> bool {
        self.model
            .read("accessible")
            .map(Value::is_truthy)
            .unwrap_or(false)
    }

    pub fn disk_type(&self) -> Option<&str> {
        self.model.text("disk_type")
    }

    pub fn actual_size(&self) -> Option<i64> {
        self.model.read("actual_size").ok().and_then(Value::as_i64)
    }

    pub fn in_use_by(&self) -> Option<&str> {
        self.model.text("in_use_by")
    }

    /// Base name of the image file.
    pub fn filename(&self) -> Option<String> {
        self.location()
            .and_then(|location| Path::new(location).file_name())
            .map(|name| name.to_string_lossy().into_owned())
    }
}

impl Persistable for HardDrive {
    fn model(&self) -> &Model {
        &self.model
    }

    fn model_mut(&mut self) -> &mut Model {
        &mut self.model
    }

    fn create_record(&mut self) -> Result<()> {
        let mut args = Vec::new();
        for (name, value) in self.model.full_payload() {
            if let Some((_, flag)) = CREATE_FLAGS.iter().find(|(attribute, _)| *attribute == name) {
                args.push(flag.to_string());
                args.push(value.to_command_arg());
            }
        }
        args.push("--remember".to_string());

        let output = self.gateway.invoke("createhd", &args)?;
        let uuid = reported_uuid("createhd", &args, &output)?;
        self.model
            .load_with(|model| model.write("uuid", uuid.as_str()))?;
        self.refresh_after_change(&uuid);
        Ok(())
    }

    fn update_record(&mut self) -> Result<()> {
        if let Some(name) = self
            .model
            .dirty_attributes()
            .into_iter()
            .find(|name| *name != "size")
        {
            return Err(ModelError::UnsupportedOperation {
                entity: self.model.entity().to_string(),
                operation: format!("changing '{}' of an existing medium", name),
            });
        }

        let uuid = self.uuid_arg("resize")?;
        let size = self.model.read("size")?.to_command_arg();
        self.gateway
            .invoke("modifyhd", &[uuid.clone(), "--resize".to_string(), size])?;
        self.model.mark_clean();
        self.refresh_after_change(&uuid);
        Ok(())
    }

    fn destroy_record(&mut self) -> Result<()> {
        let args = [
            "disk".to_string(),
            self.uuid_arg("destroy")?,
            "--delete".to_string(),
        ];
        self.gateway.invoke("closemedium", &args)?;
        Ok(())
    }
}

/// Canonical UUID of the medium a create or clone reported.
fn reported_uuid(command: &str, args: &[String], output: &str) -> Result<String> {
    convert::find_uuid(output)
        .and_then(|id| Uuid::parse_str(id).ok())
        .map(|id| id.to_string())
        .ok_or_else(|| ModelError::command_failed(command, args, "no medium UUID in output"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::ScriptedGateway;

    const REPORT: &str = "UUID:                 11dedd14-57a1-4bdb-adeb-dd1d67f066e1
Accessible:           yes
Description:
Logical size:         20480 MBytes
Current size on disk: 1218 MBytes
Type:                 normal (base)
Storage format:       VDI
In use by VMs:        FooVM (UUID: 696249ad-00b6-4087-b47f-9b82629efc31)
Location:             /Users/x/HardDisks/foo.vdi
";

    fn record() -> ParsedRecord {
        HardDrive::parser().parse_first(REPORT).unwrap()
    }

    #[test]
    fn test_report_fields_are_converted() {
        let gateway: Rc<dyn ResourceGateway> = Rc::new(ScriptedGateway::new());
        let drive = HardDrive::from_record(&gateway, &record()).unwrap();

        assert_eq!(drive.uuid(), Some("11dedd14-57a1-4bdb-adeb-dd1d67f066e1"));
        assert_eq!(drive.model.read("size").unwrap(), &Value::from("20480"));
        assert_eq!(drive.disk_type(), Some("Normal"));
        assert_eq!(drive.actual_size(), Some(1218));
        assert_eq!(drive.in_use_by(), Some("FooVM"));
        assert!(drive.is_accessible());
        assert!(!drive.is_new_record());
        assert!(!drive.model.is_dirty());
    }

    #[test]
    fn test_missing_keys_are_unset_not_defaulted() {
        let gateway: Rc<dyn ResourceGateway> = Rc::new(ScriptedGateway::new());
        let record = HardDrive::parser().parse_first("UUID: abc\n").unwrap();
        let drive = HardDrive::from_record(&gateway, &record).unwrap();

        assert_eq!(drive.format(), None);
        assert_eq!(drive.model.read("format").unwrap(), &Value::Null);
    }

    #[test]
    fn test_listing_keys_are_aliases() {
        let gateway: Rc<dyn ResourceGateway> = Rc::new(ScriptedGateway::new());
        let listing = "UUID:           11dedd14-57a1-4bdb-adeb-dd1d67f066e1
Parent UUID:    base
State:          created
Type:           multiattach (base)
Location:       /vms/foo.vdi
Storage format: VMDK
Capacity:       20480 MBytes
Encryption:     disabled
";
        let record = HardDrive::parser().parse_first(listing).unwrap();
        let mut drive = HardDrive::from_record(&gateway, &record).unwrap();

        assert_eq!(drive.size(), Some(20480));
        assert_eq!(drive.format(), Some("VMDK"));
        assert_eq!(drive.disk_type(), Some("MultiAttach"));
        assert!(drive.validate());
    }

    #[test]
    fn test_older_listing_keys() {
        let gateway: Rc<dyn ResourceGateway> = Rc::new(ScriptedGateway::new());
        let record = HardDrive::parser()
            .parse_first("UUID: abc\nFormat: VDI\nSize: 758 MBytes\nType: Normal\n")
            .unwrap();
        let drive = HardDrive::from_record(&gateway, &record).unwrap();

        assert_eq!(drive.size(), Some(758));
        assert_eq!(drive.format(), Some("VDI"));
        assert_eq!(drive.disk_type(), Some("Normal"));
    }

    #[test]
    fn test_every_vm_using_the_drive_is_kept() {
        assert_eq!(
            vm_names("FooVM (UUID: 1111) BarVM (UUID: 2222)"),
            "FooVM, BarVM"
        );
        assert_eq!(disk_type_name("custom"), "custom");
    }

    #[test]
    fn test_reported_uuid_is_canonical() {
        let uuid = reported_uuid("createhd", &[], "Disk image created. UUID: 11DEDD14-57A1-4BDB-ADEB-DD1D67F066E1\n");
        assert_eq!(uuid.unwrap(), "11dedd14-57a1-4bdb-adeb-dd1d67f066e1");

        assert!(matches!(
            reported_uuid("createhd", &[], "UUID: FOO"),
            Err(ModelError::CommandFailed { .. })
        ));
    }

    #[test]
    fn test_filename() {
        let gateway: Rc<dyn ResourceGateway> = Rc::new(ScriptedGateway::new());
        let mut drive = HardDrive::new(gateway);
        assert_eq!(drive.filename(), None);
        drive.set_location("/vms/disks/foo.vdi").unwrap();
        assert_eq!(drive.filename().as_deref(), Some("foo.vdi"));
    }
}
