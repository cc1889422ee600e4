//! Built-in scenarios.

mod member_vpc;

pub use member_vpc::MemberVpcScenario;
