//! Provisioning driver trait.

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::error::IacResult;
use crate::options::TerraformOptions;

/// Apply/destroy lifecycle plus output reading for one configuration.
///
/// [`crate::TerraformRunner`] is the production implementation; scenarios and
/// environments only see this trait.
#[async_trait]
pub trait Provisioner: Send + Sync {
    /// Initialise the working directory and apply the configuration.
    ///
    /// Returns the apply output.
    async fn init_and_apply(&self, options: &TerraformOptions) -> IacResult<String>;

    /// Destroy everything the configuration created.
    async fn destroy(&self, options: &TerraformOptions) -> IacResult<String>;

    /// Read a scalar output. String values are returned unquoted.
    async fn output(&self, options: &TerraformOptions, name: &str) -> IacResult<String>;

    /// Read a list output, preserving order.
    async fn output_list(&self, options: &TerraformOptions, name: &str) -> IacResult<Vec<String>>;

    /// Read a map output.
    async fn output_map(
        &self,
        options: &TerraformOptions,
        name: &str,
    ) -> IacResult<BTreeMap<String, String>>;
}
