use super::instance::Model;
use crate::core::{OutcomeExt, Result};
use log::debug;

/// Create/update/delete lifecycle shared by every entity.
///
/// Implementors supply the external calls; `save` and `destroy` own the state
/// machine and the `raise_on_error` translation. The `*_record` hooks must
/// leave the model untouched on failure.
pub trait Persistable {
    fn model(&self) -> &Model;

    fn model_mut(&mut self) -> &mut Model;

    /// Creates the backing resource from the full attribute set and
    /// repopulates attributes from the result.
    fn create_record(&mut self) -> Result<()>;

    /// Sends the dirty attributes only and repopulates from the result.
    fn update_record(&mut self) -> Result<()>;

    /// Removes the backing resource.
    fn destroy_record(&mut self) -> Result<()>;

    /// Validates, then creates or updates. Returns `Ok(false)` for a
    /// recoverable failure unless `raise_on_error` is set.
    fn save(&mut self, raise_on_error: bool) -> Result<bool> {
        self.try_save().map(|_| true).or_sentinel(raise_on_error, false)
    }

    fn try_save(&mut self) -> Result<()> {
        self.model().ensure_live()?;
        if !self.model_mut().validate() {
            return Err(self.model().validation_error());
        }

        if self.model().is_new_record() {
            debug!("{}: creating record", self.model().entity());
            self.create_record()?;
        } else if self.model().is_dirty() {
            debug!(
                "{}: updating {:?}",
                self.model().entity(),
                self.model().dirty_attributes()
            );
            self.update_record()?;
        } else {
            return Ok(());
        }

        let model = self.model_mut();
        model.mark_clean();
        model.mark_existing();
        Ok(())
    }

    /// Returns `Ok(false)` for a recoverable failure unless `raise_on_error` is set.
    fn destroy(&mut self, raise_on_error: bool) -> Result<bool> {
        self.try_destroy().map(|_| true).or_sentinel(raise_on_error, false)
    }

    fn try_destroy(&mut self) -> Result<()> {
        self.model().ensure_live()?;
        self.destroy_record()?;
        self.model_mut().mark_destroyed();
        Ok(())
    }

    /// Runs the declared validation rules against current values.
    fn validate(&mut self) -> bool {
        self.model_mut().validate()
    }

    fn is_new_record(&self) -> bool {
        self.model().is_new_record()
    }
}
