//! Provisioned environment handle and scoped acquisition.

use std::collections::BTreeMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures_util::FutureExt;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::IacResult;
use crate::options::TerraformOptions;
use crate::provisioner::Provisioner;

/// One Terraform configuration applied through a [`Provisioner`].
///
/// Teardown runs at most once: repeated [`Environment::destroy`] calls are
/// no-ops. A handle dropped after provisioning without teardown logs a warning;
/// use [`scoped`] to get guaranteed release.
pub struct Environment {
    id: Uuid,
    provisioner: Arc<dyn Provisioner>,
    options: TerraformOptions,
    provisioned: AtomicBool,
    torn_down: AtomicBool,
}

impl Environment {
    pub fn new(provisioner: Arc<dyn Provisioner>, options: TerraformOptions) -> Self {
        Self {
            id: Uuid::new_v4(),
            provisioner,
            options,
            provisioned: AtomicBool::new(false),
            torn_down: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn options(&self) -> &TerraformOptions {
        &self.options
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down.load(Ordering::SeqCst)
    }

    /// Init and apply the configuration.
    pub async fn provision(&self) -> IacResult<()> {
        info!(
            "Provisioning environment {} from {:?}",
            self.id, self.options.terraform_dir
        );
        // Marked before apply: a failed apply can still leave resources behind
        self.provisioned.store(true, Ordering::SeqCst);
        self.provisioner.init_and_apply(&self.options).await?;
        Ok(())
    }

    pub async fn output(&self, name: &str) -> IacResult<String> {
        self.provisioner.output(&self.options, name).await
    }

    pub async fn output_list(&self, name: &str) -> IacResult<Vec<String>> {
        self.provisioner.output_list(&self.options, name).await
    }

    pub async fn output_map(&self, name: &str) -> IacResult<BTreeMap<String, String>> {
        self.provisioner.output_map(&self.options, name).await
    }

    /// Destroy the environment.
    ///
    /// Returns `Ok(false)` without calling the provisioner when teardown
    /// already ran, successfully or not.
    pub async fn destroy(&self) -> IacResult<bool> {
        if self.torn_down.swap(true, Ordering::SeqCst) {
            debug!("Environment {} already torn down", self.id);
            return Ok(false);
        }

        info!("Destroying environment {}", self.id);
        match self.provisioner.destroy(&self.options).await {
            Ok(_) => {
                info!("Environment {} destroyed", self.id);
                Ok(true)
            }
            Err(e) => {
                error!("Destroying environment {} failed: {}", self.id, e);
                Err(e)
            }
        }
    }
}

impl Drop for Environment {
    fn drop(&mut self) {
        if *self.provisioned.get_mut() && !*self.torn_down.get_mut() {
            warn!(
                "Environment {} ({:?}) dropped without teardown",
                self.id, self.options.terraform_dir
            );
        }
    }
}

impl std::fmt::Debug for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Environment")
            .field("id", &self.id)
            .field("terraform_dir", &self.options.terraform_dir)
            .field("torn_down", &self.is_torn_down())
            .finish()
    }
}

/// Result of [`scoped`].
#[derive(Debug)]
pub struct ScopedOutcome<T> {
    pub environment_id: Uuid,
    pub provision: IacResult<()>,
    /// `None` when provisioning failed; `Err` holds a panic message.
    pub body: Option<Result<T, String>>,
    pub teardown: IacResult<()>,
}

/// Provision, run `body`, then destroy on every path.
///
/// Teardown also runs when provisioning fails (to clean up partial
/// resources) and when `body` panics; the panic is captured in
/// [`ScopedOutcome::body`].
pub async fn scoped<T, F, Fut>(
    provisioner: Arc<dyn Provisioner>,
    options: TerraformOptions,
    body: F,
) -> ScopedOutcome<T>
where
    F: FnOnce(Arc<Environment>) -> Fut,
    Fut: Future<Output = T>,
{
    let env = Arc::new(Environment::new(provisioner, options));
    let provision = env.provision().await;

    let body = match &provision {
        Ok(()) => {
            let handle = env.clone();
            Some(
                AssertUnwindSafe(async move { body(handle).await })
                    .catch_unwind()
                    .await
                    .map_err(|payload| panic_message(payload.as_ref())),
            )
        }
        Err(e) => {
            warn!("Provisioning environment {} failed: {}", env.id(), e);
            None
        }
    };

    let teardown = env.destroy().await.map(|_| ());

    ScopedOutcome {
        environment_id: env.id(),
        provision,
        body,
        teardown,
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
