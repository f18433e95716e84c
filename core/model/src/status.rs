//! Status domains of the workflow entities.
//!
//! The transition graphs live in the workflow crate; these are just the
//! closed sets of states with their persisted names.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use firewood_common::Error;

macro_rules! status_enum {
    (
        $(#[$meta:meta])*
        $name:ident { $($variant:ident => $text:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            /// Every state, in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Persisted snake_case name.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self, Error> {
                let wanted = s.trim().to_ascii_lowercase().replace(|c: char| c == ' ' || c == '-', "_");
                $name::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str() == wanted)
                    .ok_or_else(|| {
                        Error::InvalidInput(format!(
                            concat!("Unknown ", stringify!($name), ": {}"),
                            s
                        ))
                    })
            }
        }
    };
}

status_enum! {
    /// Client onboarding approval.
    ApprovalStatus {
        Pending => "pending",
        Approved => "approved",
        Denied => "denied",
    }
}

status_enum! {
    /// Work order lifecycle.
    WorkOrderStatus {
        Draft => "draft",
        Scheduled => "scheduled",
        InProgress => "in_progress",
        PickedUp => "picked_up",
        Completed => "completed",
        Cancelled => "cancelled",
    }
}

status_enum! {
    /// Change request review.
    ChangeRequestStatus {
        Open => "open",
        InReview => "in_review",
        Approved => "approved",
        Rejected => "rejected",
    }
}

status_enum! {
    /// Invoice lifecycle.
    InvoiceStatus {
        Draft => "draft",
        Sent => "sent",
        Paid => "paid",
        Void => "void",
    }
}

impl Default for ApprovalStatus {
    fn default() -> Self {
        ApprovalStatus::Pending
    }
}

impl Default for WorkOrderStatus {
    fn default() -> Self {
        WorkOrderStatus::Draft
    }
}

impl Default for ChangeRequestStatus {
    fn default() -> Self {
        ChangeRequestStatus::Open
    }
}

impl Default for InvoiceStatus {
    fn default() -> Self {
        InvoiceStatus::Draft
    }
}
