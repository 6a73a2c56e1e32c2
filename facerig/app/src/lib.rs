pub mod control;
pub mod headless_rig;
pub mod replay;
