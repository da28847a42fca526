//! Per-OS unwrapping of browser-protected secrets.

use super::CookieError;

/// Unwraps data protected by the current user's DPAPI credentials.
#[cfg(target_os = "windows")]
pub fn unwrap_platform_key(data: &[u8]) -> Result<Vec<u8>, CookieError> {
    use windows_sys::Win32::Foundation::LocalFree;
    use windows_sys::Win32::Security::Cryptography::{CryptUnprotectData, CRYPT_INTEGER_BLOB};

    if data.is_empty() {
        return Err(CookieError::KeyUnavailable("empty data".to_string()));
    }
    let mut input = data.to_vec();
    let in_blob = CRYPT_INTEGER_BLOB {
        cbData: input.len() as u32,
        pbData: input.as_mut_ptr(),
    };
    let mut out_blob = CRYPT_INTEGER_BLOB {
        cbData: 0,
        pbData: std::ptr::null_mut(),
    };

    // SAFETY: both blobs point to valid memory for the duration of the call;
    // the output buffer is allocated by the OS and released with LocalFree.
    let ok = unsafe {
        CryptUnprotectData(
            &in_blob,
            std::ptr::null_mut(),
            std::ptr::null(),
            std::ptr::null(),
            std::ptr::null(),
            0,
            &mut out_blob,
        )
    };
    if ok == 0 {
        return Err(CookieError::KeyUnavailable(format!(
            "DPAPI decryption failed: {}",
            std::io::Error::last_os_error()
        )));
    }

    // SAFETY: on success pbData holds cbData bytes owned by us until LocalFree.
    let plain = unsafe {
        let bytes = std::slice::from_raw_parts(out_blob.pbData, out_blob.cbData as usize).to_vec();
        LocalFree(out_blob.pbData.cast());
        bytes
    };
    Ok(plain)
}

#[cfg(target_os = "macos")]
pub fn unwrap_platform_key(_data: &[u8]) -> Result<Vec<u8>, CookieError> {
    Err(CookieError::KeyUnavailable(
        "Chrome Safe Storage Keychain access is not supported; paste the session key manually in Settings"
            .to_string(),
    ))
}

#[cfg(not(any(target_os = "windows", target_os = "macos")))]
pub fn unwrap_platform_key(_data: &[u8]) -> Result<Vec<u8>, CookieError> {
    Err(CookieError::KeyUnavailable(
        "libsecret/KWallet access is not supported; paste the session key manually in Settings"
            .to_string(),
    ))
}
