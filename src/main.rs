use blinko_popup::app::App;
use leptos::prelude::*;

fn main() {
    console_error_panic_hook::set_once();
    blinko_popup::logging::init();
    mount_to_body(|| {
        view! { <App/> }
    })
}
