//! Catalogue of the device queries the checks use
//!
//! The first candidate of each query is the path the N5500 firmware serves;
//! the others cover firmware that names the same data differently.

use crate::resolver::EndpointQuery;

pub const LOGIN_PATH: &str = "/adm/login.php";

const MAIN: &str = "/adm/getmain.php";

pub fn system_status() -> EndpointQuery {
    EndpointQuery::new("system status", format!("{}?fun=systatus&update=1", MAIN))
        .or(format!("{}?fun=systatus", MAIN))
}

pub fn raid_list() -> EndpointQuery {
    EndpointQuery::new("RAID list", format!("{}?fun=raid&action=getraidlist", MAIN))
}

pub fn raid_access_status() -> EndpointQuery {
    EndpointQuery::new(
        "RAID access status",
        format!("{}?fun=raid&action=getAccessStatus", MAIN),
    )
}

pub fn disk_list() -> EndpointQuery {
    EndpointQuery::new("disk list", format!("{}?fun=disks&update=1", MAIN))
        .or(format!("{}?fun=disks", MAIN))
}

/// SMART data of one disk. Firmware differs in which of `diskno`/`trayno` it
/// understands and answers the others with a placeholder, so every variant is
/// collected and the caller keeps the first real one.
pub fn smart_info(disk: &str, tray: &str) -> EndpointQuery {
    let disk = urlencoding::encode(disk);
    let tray = urlencoding::encode(tray);
    EndpointQuery::new(
        format!("SMART info of disk {}", tray),
        format!("{}?fun=smart&diskno={}&trayno={}", MAIN, disk, tray),
    )
    .or(format!("{}?fun=smart&diskno={}", MAIN, disk))
    .or(format!("{}?fun=smart&trayno={}", MAIN, tray))
    .collecting_all()
}
