//! Supported subset of the standard Web Bluetooth interfaces
//! Every member of the mirrored interfaces is listed here together with whether
//! the wrappers implement it. Stubbed members fail immediately with
//! [`Error::NotImplemented`].

use log::warn;

use crate::error::Error;

pub const BLUETOOTH_DEVICE: &str = "BluetoothDevice";
pub const GATT_SERVER: &str = "BluetoothRemoteGATTServer";
pub const GATT_SERVICE: &str = "BluetoothRemoteGATTService";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Support {
    Supported,
    Stubbed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Member {
    pub name: &'static str,
    pub support: Support,
}

const fn supported(name: &'static str) -> Member {
    Member {
        name,
        support: Support::Supported,
    }
}

const fn stubbed(name: &'static str) -> Member {
    Member {
        name,
        support: Support::Stubbed,
    }
}

pub const DEVICE_MEMBERS: &[Member] = &[
    supported("id"),
    supported("name"),
    supported("gatt"),
    supported("forget"),
    supported("watchAdvertisements"),
    supported("watchingAdvertisements"),
    supported("ongattserverdisconnected"),
    stubbed("addEventListener"),
    stubbed("removeEventListener"),
    stubbed("dispatchEvent"),
    stubbed("onadvertisementreceived"),
    stubbed("oncharacteristicvaluechanged"),
    stubbed("onserviceadded"),
    stubbed("onservicechanged"),
    stubbed("onserviceremoved"),
];

pub const GATT_SERVER_MEMBERS: &[Member] = &[
    supported("device"),
    supported("connected"),
    supported("connect"),
    supported("disconnect"),
    supported("getPrimaryService"),
    stubbed("getPrimaryServices"),
];

pub const GATT_SERVICE_MEMBERS: &[Member] = &[
    supported("device"),
    supported("uuid"),
    supported("isPrimary"),
    stubbed("getCharacteristic"),
    stubbed("getCharacteristics"),
    stubbed("getIncludedService"),
    stubbed("getIncludedServices"),
    stubbed("addEventListener"),
    stubbed("removeEventListener"),
    stubbed("dispatchEvent"),
    stubbed("oncharacteristicvaluechanged"),
    stubbed("onserviceadded"),
    stubbed("onservicechanged"),
    stubbed("onserviceremoved"),
];

/// Members of a mirrored interface, or an empty slice for unknown interfaces.
pub fn members(interface: &str) -> &'static [Member] {
    match interface {
        BLUETOOTH_DEVICE => DEVICE_MEMBERS,
        GATT_SERVER => GATT_SERVER_MEMBERS,
        GATT_SERVICE => GATT_SERVICE_MEMBERS,
        _ => &[],
    }
}

pub fn support(interface: &str, member: &str) -> Option<Support> {
    members(interface)
        .iter()
        .find(|m| m.name == member)
        .map(|m| m.support)
}

pub fn supports(interface: &str, member: &str) -> bool {
    support(interface, member) == Some(Support::Supported)
}

pub(crate) fn not_implemented(interface: &'static str, member: &'static str) -> Error {
    warn!("{}.{} is not implemented", interface, member);
    Error::NotImplemented { interface, member }
}
