//! Verdict code families a classifier can count.

/// XDP verdicts (`enum xdp_action`).
pub mod xdp_action {
    pub const XDP_ABORTED: u32 = 0;
    pub const XDP_DROP: u32 = 1;
    pub const XDP_PASS: u32 = 2;
    pub const XDP_TX: u32 = 3;
    pub const XDP_REDIRECT: u32 = 4;
}

/// TC classifier verdicts (`TC_ACT_*`).
pub mod tc_action {
    pub const TC_ACT_OK: u32 = 0;
    pub const TC_ACT_RECLASSIFY: u32 = 1;
    pub const TC_ACT_SHOT: u32 = 2;
    pub const TC_ACT_PIPE: u32 = 3;
    pub const TC_ACT_STOLEN: u32 = 4;
    pub const TC_ACT_QUEUED: u32 = 5;
    pub const TC_ACT_REPEAT: u32 = 6;
    pub const TC_ACT_REDIRECT: u32 = 7;
    pub const TC_ACT_VALUE_MAX: u32 = 8;
}

/// A family of verdict codes usable as classification keys.
pub trait ActionSet: Send + 'static {
    /// Program name, used in logs and metric labels.
    const NAME: &'static str;
    /// Exclusive upper bound of countable codes.
    const MAX_ACTIONS: u32;
    /// Code returned when an invocation is rejected.
    const REJECT: u32;
    /// Code the program's entry point classifies packets with.
    const DEFAULT: u32;

    fn action_name(code: u32) -> Option<&'static str>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Xdp;

impl ActionSet for Xdp {
    const NAME: &'static str = "xdp";
    const MAX_ACTIONS: u32 = xdp_action::XDP_REDIRECT + 1;
    const REJECT: u32 = xdp_action::XDP_ABORTED;
    const DEFAULT: u32 = xdp_action::XDP_PASS;

    fn action_name(code: u32) -> Option<&'static str> {
        use xdp_action::*;
        Some(match code {
            XDP_ABORTED => "XDP_ABORTED",
            XDP_DROP => "XDP_DROP",
            XDP_PASS => "XDP_PASS",
            XDP_TX => "XDP_TX",
            XDP_REDIRECT => "XDP_REDIRECT",
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tc;

impl ActionSet for Tc {
    const NAME: &'static str = "tc";
    const MAX_ACTIONS: u32 = tc_action::TC_ACT_VALUE_MAX;
    const REJECT: u32 = tc_action::TC_ACT_SHOT;
    const DEFAULT: u32 = tc_action::TC_ACT_OK;

    fn action_name(code: u32) -> Option<&'static str> {
        use tc_action::*;
        Some(match code {
            TC_ACT_OK => "TC_ACT_OK",
            TC_ACT_RECLASSIFY => "TC_ACT_RECLASSIFY",
            TC_ACT_SHOT => "TC_ACT_SHOT",
            TC_ACT_PIPE => "TC_ACT_PIPE",
            TC_ACT_STOLEN => "TC_ACT_STOLEN",
            TC_ACT_QUEUED => "TC_ACT_QUEUED",
            TC_ACT_REPEAT => "TC_ACT_REPEAT",
            TC_ACT_REDIRECT => "TC_ACT_REDIRECT",
            _ => return None,
        })
    }
}
