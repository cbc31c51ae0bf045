#![no_main]

use gamebus_admin_client::router;
use gamebus_admin_client::session::Session;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Raw bytes go through serde_json's own UTF-8 validation.
    let _ = serde_json::from_slice::<gamebus_admin_client::protocol::ServerMessage>(data);

    // Valid text is routed into a live session; no frame may panic it.
    if let Ok(s) = std::str::from_utf8(data) {
        let mut session = Session::new("fuzz");
        session.begin_connect();
        session.opened();
        let _ = router::route(&mut session, s);
        let _ = session.request_phase(gamebus_admin_client::GamePhase::Pause);
    }
});
