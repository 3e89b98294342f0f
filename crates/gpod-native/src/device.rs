//! Device record: mountpoint, SysInfo and capability queries

use crate::error::{file_error_code, set_error, GError, G_FILE_ERROR, ITDB_DEVICE_ERROR, ITDB_DEVICE_ERROR_SYSINFO};
use crate::ipod_info::{self, Itdb_IpodInfo};
use crate::mem::{self, dup_str, read_str, replace_str};
use crate::{gbool, gboolean, FALSE, TRUE};
use std::collections::BTreeMap;
use std::ffi::CStr;
use std::fs;
use std::os::raw::{c_char, c_int};
use std::path::{Path, PathBuf};
use std::ptr;
use tracing::{debug, warn};

pub const CONTROL_DIR: &str = "iPod_Control";
pub const SYSINFO_FIELD_MODEL: &str = "ModelNumStr";

#[repr(C)]
#[derive(Debug)]
pub struct Itdb_Device {
    pub mountpoint: *mut c_char,
    pub musicdirs: c_int,
    pub sysinfo: *mut SysInfo,
    pub sysinfo_changed: gboolean,
}

/// Parsed `iPod_Control/Device/SysInfo` (opaque to callers)
#[derive(Debug, Default, Clone)]
pub struct SysInfo {
    fields: BTreeMap<String, String>,
}

impl SysInfo {
    fn parse(text: &str) -> Self {
        let fields = text
            .lines()
            .filter_map(|line| line.split_once(':'))
            .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
            .filter(|(k, _)| !k.is_empty())
            .collect();
        Self { fields }
    }

    fn render(&self) -> String {
        self.fields
            .iter()
            .map(|(k, v)| format!("{}: {}\n", k, v))
            .collect()
    }
}

/// `<mountpoint>/iPod_Control`
pub fn control_dir(mountpoint: &Path) -> PathBuf {
    mountpoint.join(CONTROL_DIR)
}

/// `<mountpoint>/iPod_Control/Device/SysInfo`
pub fn sysinfo_path(mountpoint: &Path) -> PathBuf {
    control_dir(mountpoint).join("Device").join("SysInfo")
}

/// Mountpoint of `device` as a path, if set.
pub(crate) unsafe fn mountpoint_of(device: *const Itdb_Device) -> Option<PathBuf> {
    device
        .as_ref()
        .and_then(|d| read_str(d.mountpoint))
        .map(PathBuf::from)
}

pub(crate) unsafe fn generation_of(device: *const Itdb_Device) -> Option<u32> {
    if device.is_null() {
        return None;
    }
    Some((*itdb_device_get_ipod_info(device)).ipod_generation)
}

#[no_mangle]
pub extern "C" fn itdb_device_new() -> *mut Itdb_Device {
    let sysinfo = mem::alloc(SysInfo::default(), "sysinfo");
    mem::alloc(
        Itdb_Device {
            mountpoint: ptr::null_mut(),
            musicdirs: 0,
            sysinfo,
            sysinfo_changed: FALSE,
        },
        "device",
    )
}

#[no_mangle]
pub unsafe extern "C" fn itdb_device_free(device: *mut Itdb_Device) {
    if device.is_null() {
        return;
    }
    mem::g_free((*device).mountpoint as _);
    mem::dealloc((*device).sysinfo, "sysinfo");
    mem::dealloc(device, "device");
}

/// Set the mountpoint and reload SysInfo from it.
#[no_mangle]
pub unsafe extern "C" fn itdb_device_set_mountpoint(device: *mut Itdb_Device, mp: *const c_char) {
    if device.is_null() {
        return;
    }
    let mp = read_str(mp);
    replace_str(&mut (*device).mountpoint, mp.as_deref());
    itdb_device_read_sysinfo(device);
}

/// Reload SysInfo. Returns FALSE (with an empty table) when no file is found.
#[no_mangle]
pub unsafe extern "C" fn itdb_device_read_sysinfo(device: *mut Itdb_Device) -> gboolean {
    let Some(dev) = device.as_mut() else {
        return FALSE;
    };
    let mountpoint = read_str(dev.mountpoint).map(PathBuf::from);
    dev.sysinfo_changed = FALSE;
    let Some(info) = dev.sysinfo.as_mut() else {
        return FALSE;
    };
    *info = SysInfo::default();
    let Some(mp) = mountpoint else {
        return FALSE;
    };
    match fs::read_to_string(sysinfo_path(&mp)) {
        Ok(text) => {
            *info = SysInfo::parse(&text);
            debug!(fields = info.fields.len(), "read SysInfo");
            TRUE
        }
        Err(_) => FALSE,
    }
}

/// Value of a SysInfo field as a new string (free with `g_free`), or NULL.
#[no_mangle]
pub unsafe extern "C" fn itdb_device_get_sysinfo(device: *const Itdb_Device, field: *const c_char) -> *mut c_char {
    let (Some(dev), false) = (device.as_ref(), field.is_null()) else {
        return ptr::null_mut();
    };
    let Some(info) = dev.sysinfo.as_ref() else {
        return ptr::null_mut();
    };
    let key = CStr::from_ptr(field).to_string_lossy();
    info.fields.get(key.as_ref()).map_or(ptr::null_mut(), |v| dup_str(v))
}

/// Set a SysInfo field; a NULL value removes it.
#[no_mangle]
pub unsafe extern "C" fn itdb_device_set_sysinfo(
    device: *mut Itdb_Device,
    field: *const c_char,
    value: *const c_char,
) {
    let (Some(dev), false) = (device.as_mut(), field.is_null()) else {
        return;
    };
    let Some(info) = dev.sysinfo.as_mut() else {
        return;
    };
    let key = CStr::from_ptr(field).to_string_lossy().into_owned();
    match read_str(value) {
        Some(v) => {
            info.fields.insert(key, v);
        }
        None => {
            info.fields.remove(&key);
        }
    }
    dev.sysinfo_changed = TRUE;
}

/// Write SysInfo back to the device.
#[no_mangle]
pub unsafe extern "C" fn itdb_device_write_sysinfo(device: *mut Itdb_Device, error: *mut *mut GError) -> gboolean {
    let Some(dev) = device.as_mut() else {
        return FALSE;
    };
    let Some(mp) = read_str(dev.mountpoint).map(PathBuf::from) else {
        set_error(error, ITDB_DEVICE_ERROR, ITDB_DEVICE_ERROR_SYSINFO, "Mountpoint not set.");
        return FALSE;
    };
    let path = sysinfo_path(&mp);
    let text = dev.sysinfo.as_ref().map(SysInfo::render).unwrap_or_default();
    let result = path
        .parent()
        .map_or(Ok(()), fs::create_dir_all)
        .and_then(|_| fs::write(&path, text));
    match result {
        Ok(()) => {
            dev.sysinfo_changed = FALSE;
            TRUE
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "could not write SysInfo");
            set_error(
                error,
                G_FILE_ERROR,
                file_error_code(&e),
                format!("Could not open '{}' for writing: {}", path.display(), e),
            );
            FALSE
        }
    }
}

/// Model row for this device: "Invalid" without a `ModelNumStr`, "Unknown"
/// for an unrecognised one.
#[no_mangle]
pub unsafe extern "C" fn itdb_device_get_ipod_info(device: *const Itdb_Device) -> *const Itdb_IpodInfo {
    let rows = ipod_info::ipod_info_rows();
    let model = device
        .as_ref()
        .and_then(|d| d.sysinfo.as_ref())
        .and_then(|info| info.fields.get(SYSINFO_FIELD_MODEL));
    match model {
        Some(model) => ipod_info::lookup_model(model),
        None => &rows[0],
    }
}

#[no_mangle]
pub unsafe extern "C" fn itdb_device_supports_artwork(device: *const Itdb_Device) -> gboolean {
    gbool(generation_of(device).is_some_and(|g| !ipod_info::cover_art_formats(g).is_empty()))
}

#[no_mangle]
pub unsafe extern "C" fn itdb_device_supports_photo(device: *const Itdb_Device) -> gboolean {
    gbool(generation_of(device).is_some_and(|g| !ipod_info::photo_formats(g).is_empty()))
}

#[no_mangle]
pub unsafe extern "C" fn itdb_device_supports_video(device: *const Itdb_Device) -> gboolean {
    gbool(generation_of(device).is_some_and(ipod_info::supports_video))
}

#[no_mangle]
pub unsafe extern "C" fn itdb_device_supports_podcast(device: *const Itdb_Device) -> gboolean {
    gbool(generation_of(device).is_some_and(ipod_info::supports_podcast))
}

#[no_mangle]
pub unsafe extern "C" fn itdb_device_supports_chapter_image(device: *const Itdb_Device) -> gboolean {
    gbool(generation_of(device).is_some_and(ipod_info::supports_chapter_image))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger;
    use std::ffi::CString;
    use tempfile::TempDir;

    fn device_at(dir: &TempDir) -> *mut Itdb_Device {
        let dev = itdb_device_new();
        let mp = CString::new(dir.path().to_str().unwrap()).unwrap();
        unsafe { itdb_device_set_mountpoint(dev, mp.as_ptr()) };
        dev
    }

    #[test]
    fn test_sysinfo_round_trip() {
        let dir = TempDir::new().unwrap();
        let before = ledger::live_allocations();
        let dev = device_at(&dir);
        unsafe {
            assert_eq!(
                (*itdb_device_get_ipod_info(dev)).ipod_model,
                ipod_info::ITDB_IPOD_MODEL_INVALID
            );
            itdb_device_set_sysinfo(dev, c"ModelNumStr".as_ptr(), c"xA079".as_ptr());
            assert_eq!((*dev).sysinfo_changed, TRUE);
            let mut err = ptr::null_mut();
            assert_eq!(itdb_device_write_sysinfo(dev, &mut err), TRUE);
            assert!(err.is_null());
            itdb_device_free(dev);

            let dev = device_at(&dir);
            let value = itdb_device_get_sysinfo(dev, c"ModelNumStr".as_ptr());
            assert_eq!(read_str(value).as_deref(), Some("xA079"));
            mem::g_free(value as _);
            assert_eq!(itdb_device_supports_photo(dev), TRUE);
            assert_eq!(itdb_device_supports_video(dev), FALSE);
            itdb_device_free(dev);
        }
        assert_eq!(ledger::live_allocations(), before);
    }

    #[test]
    fn test_null_device_supports_nothing() {
        unsafe {
            assert_eq!(itdb_device_supports_artwork(ptr::null()), FALSE);
            assert_eq!(itdb_device_supports_podcast(ptr::null()), FALSE);
        }
    }
}
