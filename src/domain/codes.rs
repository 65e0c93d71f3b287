//! Closed code lists the network accepts for the coded message fields.
//!
//! Every code is parsed from its wire spelling and rendered back verbatim,
//! so a value that made it into the message model is always on the list.

use crate::error::Pacs008Error;

/// A closed list of wire codes.
pub trait CodeList: Sized + Default {
    /// Parses the wire code, reporting failures against `field`.
    fn parse_for(field: &'static str, raw: &str) -> Result<Self, Pacs008Error>;
}

macro_rules! code_list {
    (
        $(#[$meta:meta])*
        $name:ident, $field:literal {
            $($variant:ident => $code:literal),+ $(,)?
        }
        default $default:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $code),+
                }
            }
        }

        impl CodeList for $name {
            fn parse_for(field: &'static str, raw: &str) -> Result<Self, Pacs008Error> {
                match raw.trim() {
                    $($code => Ok($name::$variant),)+
                    other => Err(Pacs008Error::validation(
                        field,
                        format!("unknown code `{other}`"),
                    )),
                }
            }
        }

        impl Default for $name {
            fn default() -> Self {
                $name::$default
            }
        }

        impl std::str::FromStr for $name {
            type Err = Pacs008Error;

            fn from_str(raw: &str) -> Result<Self, Self::Err> {
                Self::parse_for($field, raw)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

code_list! {
    /// `ExternalCashAccountType1Code` subset used by Pix.
    AccountType, "account_type" {
        Current => "CACC",
        Salary => "SLRY",
        Savings => "SVGS",
        Payment => "TRAN",
    }
    default Current
}

code_list! {
    /// `Priority2Code`.
    Priority, "priority" {
        High => "HIGH",
        Normal => "NORM",
    }
    default High
}

code_list! {
    /// Proprietary service level (`SvcLvl/Prtry`).
    ServiceLevel, "service_level" {
        Priority => "PAGPRI",
        Fraud => "PAGFRD",
        Scheduled => "PAGAGD",
    }
    default Priority
}

code_list! {
    /// Proprietary local instrument: how the payment was initiated.
    LocalInstrument, "local_instrument" {
        Manual => "MANU",
        Dict => "DICT",
        StaticQrCode => "QRDN",
        DynamicQrCode => "QRES",
        Initiator => "INIC",
    }
    default Manual
}

code_list! {
    /// `ExternalPurpose1Code` subset.
    Purpose, "purpose" {
        Payment => "IPAY",
        Purchase => "GSCB",
        Other => "OTHR",
    }
    default Payment
}

code_list! {
    /// `ChargeBearerType1Code`; the network only settles under service-level rules.
    ChargeBearer, "charge_bearer" {
        ServiceLevel => "SLEV",
    }
    default ServiceLevel
}

code_list! {
    /// `SettlementMethod1Code`; settlement always goes through the clearing system.
    SettlementMethod, "settlement_method" {
        Clearing => "CLRG",
    }
    default Clearing
}
