//! Platform status codes.
//!
//! Every response carries a numeric `code`; `0` is success. The table maps
//! the documented codes to a short description and a hint.

/// A documented status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusInfo {
    pub code: i64,
    pub description: &'static str,
    pub hint: &'static str,
}

const UNKNOWN: (&str, &str) = ("undefined", "code is not in the status table");

const TABLE: &[(i64, &str, &str)] = &[
    (0, "success", "OK"),
    (4000, "invalid parameter", "check required parameters and size limits"),
    (4001, "invalid app", "check that x-bili-accesskeyid is set and valid"),
    (4002, "signature error", "check the Authorization header"),
    (4003, "request expired", "check x-bili-timestamp"),
    (4004, "duplicate request", "check x-bili-signature-nonce"),
    (4005, "invalid signature method", "check x-bili-signature-method"),
    (4006, "invalid version", "check x-bili-signature-version"),
    (4007, "IP not allowlisted", "request from a registered server address"),
    (4008, "permission denied", "check API permissions"),
    (4009, "rate limited", "check API permissions and request frequency"),
    (4010, "no such API", "check the request path"),
    (4011, "Content-Type is not application/json", "check the Content-Type header"),
    (4012, "content MD5 mismatch", "check x-bili-content-md5"),
    (4013, "Accept is not application/json", "check the Accept header"),
    (5000, "service error", "contact the platform"),
    (5001, "request timed out", "request timed out"),
    (5002, "internal error", "contact the platform"),
    (5003, "configuration error", "contact the platform"),
    (5004, "room allowlist restriction", "contact the platform"),
    (5005, "room blocklist restriction", "contact the platform"),
    (6000, "verification code error", "verification failed"),
    (6001, "invalid phone number", "check the phone number"),
    (6002, "verification code expired", "code is past its validity period"),
    (6003, "verification code rate limited", "check how often codes are requested"),
    (7000, "not in game", "the room has no interactive game running"),
    (7001, "cooling down", "previous game is settling, retry in about 10 seconds"),
    (7002, "game already running", "the room is running a game, cannot start another"),
    (7003, "heartbeat expired", "game id is wrong or the game has ended"),
    (7004, "batch heartbeat too large", "at most 200 game ids per batch"),
    (7005, "duplicate game id in batch", "game ids in a batch must be unique"),
    (7007, "invalid identity code", "check the streamer's identity code"),
    (8002, "no access to app", "check the app id"),
];

/// Looks up a status code. Unknown codes get a generic description.
pub fn lookup(code: i64) -> StatusInfo {
    let (description, hint) = TABLE
        .iter()
        .find(|(c, _, _)| *c == code)
        .map(|(_, d, h)| (*d, *h))
        .unwrap_or(UNKNOWN);

    StatusInfo {
        code,
        description,
        hint,
    }
}

/// Returns whether `code` is the success code.
pub fn is_success(code: i64) -> bool {
    code == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_known() {
        let info = lookup(4002);
        assert_eq!(info.code, 4002);
        assert_eq!(info.description, "signature error");

        assert_eq!(lookup(7003).description, "heartbeat expired");
        assert_eq!(lookup(8002).description, "no access to app");
    }

    #[test]
    fn test_lookup_unknown() {
        let info = lookup(9999);
        assert_eq!(info.code, 9999);
        assert_eq!(info.description, "undefined");
        // 7006 is a gap in the documented range.
        assert_eq!(lookup(7006).description, "undefined");
    }

    #[test]
    fn test_table_has_unique_codes() {
        let mut codes: Vec<i64> = TABLE.iter().map(|(c, _, _)| *c).collect();
        let len = codes.len();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), len);
    }

    #[test]
    fn test_is_success() {
        assert!(is_success(0));
        assert!(!is_success(4000));
    }
}
