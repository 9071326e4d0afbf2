//! Backend endpoints of the workshop application and their intercept rules.

use crate::intercept::{HttpMethod, InterceptRule};
use crate::result::HarnessResult;

/// Job list query
pub const JOB_INDEX: &str = "api/job-mgmt/odata/jobindex";
/// Job resource
pub const JOBS: &str = "api/job-mgmt/jobs";
/// Customer resource
pub const CUSTOMERS: &str = "api/job-mgmt/customers";
/// Part resource
pub const PARTS: &str = "api/inventory/parts";
/// Part merge action
pub const PARTS_MERGE: &str = "api/inventory/parts/merge";

/// Aliases shared by rules and awaits
pub mod alias {
    /// Job list query
    pub const JOB_INDEX: &str = "jobIndex";
    /// Job read, including the refetch after edits
    pub const GET_JOB: &str = "getJob";
    /// Customer details update
    pub const UPDATE_CUSTOMER: &str = "updateCustomer";
    /// Job creation
    pub const CREATE_JOB: &str = "createJob";
    /// Job update
    pub const UPDATE_JOB: &str = "updateJob";
    /// Job deletion
    pub const DELETE_JOB: &str = "deleteJob";
    /// Part list query
    pub const PARTS_LIST: &str = "partsList";
    /// Part read
    pub const GET_PART: &str = "getPart";
    /// Part creation
    pub const CREATE_PART: &str = "createPart";
    /// Part update
    pub const UPDATE_PART: &str = "updatePart";
    /// Part deletion
    pub const DELETE_PART: &str = "deletePart";
    /// Part merge
    pub const MERGE_PARTS: &str = "mergeParts";
    /// Stock adjustment on one part
    pub const ADJUST_STOCK: &str = "adjustStock";
}

fn rule(method: HttpMethod, glob: String, name: &str) -> HarnessResult<InterceptRule> {
    InterceptRule::new(method, &glob, name)
}

/// Rules for the job screens
pub fn job_rules() -> HarnessResult<Vec<InterceptRule>> {
    Ok(vec![
        rule(HttpMethod::Get, format!("**/{JOB_INDEX}*"), alias::JOB_INDEX)?,
        rule(HttpMethod::Get, format!("**/{JOBS}/**"), alias::GET_JOB)?,
        rule(HttpMethod::Patch, format!("**/{CUSTOMERS}/**"), alias::UPDATE_CUSTOMER)?,
        rule(HttpMethod::Post, format!("**/{JOBS}"), alias::CREATE_JOB)?,
        rule(HttpMethod::Put, format!("**/{JOBS}/*"), alias::UPDATE_JOB)?,
        rule(HttpMethod::Delete, format!("**/{JOBS}/*"), alias::DELETE_JOB)?,
    ])
}

/// Rules for the inventory screens
pub fn parts_rules() -> HarnessResult<Vec<InterceptRule>> {
    Ok(vec![
        rule(HttpMethod::Get, format!("**/{PARTS}"), alias::PARTS_LIST)?,
        rule(HttpMethod::Get, format!("**/{PARTS}/*"), alias::GET_PART)?,
        rule(HttpMethod::Post, format!("**/{PARTS}"), alias::CREATE_PART)?,
        rule(HttpMethod::Put, format!("**/{PARTS}/*"), alias::UPDATE_PART)?,
        rule(HttpMethod::Delete, format!("**/{PARTS}/*"), alias::DELETE_PART)?,
        rule(HttpMethod::Post, format!("**/{PARTS_MERGE}"), alias::MERGE_PARTS)?,
        rule(HttpMethod::Patch, format!("**/{PARTS}/*/stock"), alias::ADJUST_STOCK)?,
    ])
}

/// Every rule the workflows await on
pub fn all_rules() -> HarnessResult<Vec<InterceptRule>> {
    let mut rules = job_rules()?;
    rules.extend(parts_rules()?);
    Ok(rules)
}
