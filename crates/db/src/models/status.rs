//! Status helper enums mapping to SMALLINT lookup tables.
//!
//! Each enum variant's discriminant matches the seed data in the
//! corresponding `*_statuses` database table.

use unwritten_core::order::OrderStatus;

/// Status ID type matching SMALLINT in the database.
pub type StatusId = i16;

macro_rules! define_status_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $val:expr ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[repr(i16)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum $name {
            $( $(#[$vmeta])* $variant = $val ),+
        }

        impl $name {
            /// Return the database status ID.
            pub fn id(self) -> StatusId {
                self as StatusId
            }

            /// Look up a variant by database status ID.
            pub fn from_id(id: StatusId) -> Option<Self> {
                match id {
                    $( v if v == $val => Some(Self::$variant), )+
                    _ => None,
                }
            }
        }

        impl From<$name> for StatusId {
            fn from(value: $name) -> Self {
                value as StatusId
            }
        }
    };
}

define_status_enum! {
    /// Order lifecycle status (`order_statuses`).
    OrderStatusId {
        Created = 1,
        PaymentConfirmed = 2,
        Rendering = 3,
        Submitted = 4,
        Accepted = 5,
        Printing = 6,
        Shipped = 7,
        Delivered = 8,
        Failed = 9,
        Expired = 10,
    }
}

impl From<OrderStatus> for OrderStatusId {
    fn from(status: OrderStatus) -> Self {
        match status {
            OrderStatus::Created => Self::Created,
            OrderStatus::PaymentConfirmed => Self::PaymentConfirmed,
            OrderStatus::Rendering => Self::Rendering,
            OrderStatus::Submitted => Self::Submitted,
            OrderStatus::Accepted => Self::Accepted,
            OrderStatus::Printing => Self::Printing,
            OrderStatus::Shipped => Self::Shipped,
            OrderStatus::Delivered => Self::Delivered,
            OrderStatus::Failed => Self::Failed,
            OrderStatus::Expired => Self::Expired,
        }
    }
}

impl From<OrderStatusId> for OrderStatus {
    fn from(id: OrderStatusId) -> Self {
        match id {
            OrderStatusId::Created => Self::Created,
            OrderStatusId::PaymentConfirmed => Self::PaymentConfirmed,
            OrderStatusId::Rendering => Self::Rendering,
            OrderStatusId::Submitted => Self::Submitted,
            OrderStatusId::Accepted => Self::Accepted,
            OrderStatusId::Printing => Self::Printing,
            OrderStatusId::Shipped => Self::Shipped,
            OrderStatusId::Delivered => Self::Delivered,
            OrderStatusId::Failed => Self::Failed,
            OrderStatusId::Expired => Self::Expired,
        }
    }
}

/// Database id of a core order status.
pub fn order_status_id(status: OrderStatus) -> StatusId {
    OrderStatusId::from(status).id()
}
