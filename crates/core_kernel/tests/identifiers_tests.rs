//! Unit tests for the Identifiers module
//!
//! Tests cover identifier creation, parsing, conversion, and display formatting.

use core_kernel::{ClaimId, StaffId, ProjectId, AuditEntryId};
use uuid::Uuid;

mod claim_id_tests {
    use super::*;

    #[test]
    fn test_new_generates_unique_ids() {
        let id1 = ClaimId::new();
        let id2 = ClaimId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_new_v7_generates_time_ordered_ids() {
        let id1 = ClaimId::new_v7();
        std::thread::sleep(std::time::Duration::from_millis(1));
        let id2 = ClaimId::new_v7();
        assert!(id1 < id2);
    }

    #[test]
    fn test_from_uuid() {
        let uuid = Uuid::new_v4();
        let id = ClaimId::from_uuid(uuid);
        assert_eq!(*id.as_uuid(), uuid);
    }

    #[test]
    fn test_parse_with_and_without_prefix() {
        let uuid = Uuid::new_v4();
        let with_prefix: ClaimId = format!("CLM-{}", uuid).parse().unwrap();
        let bare: ClaimId = uuid.to_string().parse().unwrap();
        assert_eq!(with_prefix, bare);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("CLM-not-a-uuid".parse::<ClaimId>().is_err());
    }

    #[test]
    fn test_serde_is_transparent() {
        let id = ClaimId::new();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id.as_uuid()));
    }
}

mod prefix_tests {
    use super::*;

    #[test]
    fn test_prefixes() {
        assert_eq!(ClaimId::prefix(), "CLM");
        assert_eq!(StaffId::prefix(), "STF");
        assert_eq!(ProjectId::prefix(), "PRJ");
        assert_eq!(AuditEntryId::prefix(), "AUD");
    }

    #[test]
    fn test_display_uses_prefix() {
        assert!(StaffId::new().to_string().starts_with("STF-"));
        assert!(ProjectId::new().to_string().starts_with("PRJ-"));
        assert!(AuditEntryId::new().to_string().starts_with("AUD-"));
    }
}
