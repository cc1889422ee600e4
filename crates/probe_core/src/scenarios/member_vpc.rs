//! Member VPC scenario.
//!
//! Applies the member VPC configuration and checks the VPC id, its single
//! secondary CIDR block and the subnets carved from it.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use probe_assert::Assertions;
use probe_iac::Environment;

use crate::error::CoreResult;
use crate::scenario::Scenario;

pub struct MemberVpcScenario {
    dir: PathBuf,
}

impl MemberVpcScenario {
    pub const NAME: &'static str = "member-vpc";
    pub const DEFAULT_DIR: &'static str = "./unit-test";
    pub const SECONDARY_CIDR: &'static str = "192.168.16.0/20";

    pub const VPC_ID_OUTPUT: &'static str = "vpc_id";
    pub const SECONDARY_CIDR_BLOCKS_OUTPUT: &'static str = "secondary_cidr_blocks";
    pub const SECONDARY_SUBNETS_OUTPUT: &'static str = "secondary_cidr_subnet_ids";

    pub fn new() -> Self {
        Self {
            dir: PathBuf::from(Self::DEFAULT_DIR),
        }
    }
}

impl Default for MemberVpcScenario {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Scenario for MemberVpcScenario {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        "VPC with one secondary CIDR block and subnets in it"
    }

    fn default_dir(&self) -> &Path {
        &self.dir
    }

    async fn verify(&self, env: &Environment, checks: &mut Assertions) -> CoreResult<()> {
        let vpc_id = env.output(Self::VPC_ID_OUTPUT).await?;
        checks.contains("vpc_id contains vpc-", &vpc_id, "vpc-");
        checks.matches("vpc_id matches vpc-*", &vpc_id, "vpc-*");

        let cidr_blocks = env.output_list(Self::SECONDARY_CIDR_BLOCKS_OUTPUT).await?;
        checks.len_eq("Should have 1 secondary CIDR block", &cidr_blocks, 1);
        match cidr_blocks.first() {
            Some(block) => {
                checks.equal(
                    "Secondary CIDR should be 192.168.16.0/20",
                    Self::SECONDARY_CIDR,
                    block.as_str(),
                );
            }
            None => checks.fail(
                "Secondary CIDR should be 192.168.16.0/20",
                "no secondary CIDR block at index 0",
                format!("{:?}", Self::SECONDARY_CIDR),
                "[]",
            ),
        }

        let subnet_ids = env.output_list(Self::SECONDARY_SUBNETS_OUTPUT).await?;
        checks.greater(
            "Should have at least one secondary CIDR subnet",
            subnet_ids.len(),
            0,
        );
        for subnet_id in &subnet_ids {
            checks.contains(
                format!("{} contains subnet-", subnet_id),
                subnet_id,
                "subnet-",
            );
        }

        Ok(())
    }
}
