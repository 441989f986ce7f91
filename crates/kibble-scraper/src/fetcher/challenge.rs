/// `true` when `body` is an anti-bot interstitial rather than the requested
/// page (Cloudflare, Akamai, PerimeterX, DataDome).
#[must_use]
pub fn looks_like_bot_challenge(body: &str) -> bool {
    let lowered = body.to_ascii_lowercase();
    let has_cloudflare_banner = lowered.contains("attention required! | cloudflare");
    let has_challenge_platform = lowered.contains("/cdn-cgi/challenge-platform/");
    let has_just_a_moment = lowered.contains("just a moment...");
    let has_cookie_gate = lowered.contains("please enable cookies");
    let has_cf_chl = lowered.contains("cf-chl-");
    let has_akamai_denial =
        lowered.contains("<title>access denied</title>") && lowered.contains("reference #");
    let has_perimeterx = lowered.contains("px-captcha") || lowered.contains("_pxcaptcha");
    let has_datadome = lowered.contains("captcha-delivery.com");

    has_cloudflare_banner
        || has_challenge_platform
        || (has_just_a_moment && has_cookie_gate)
        || (has_just_a_moment && has_cf_chl)
        || has_akamai_denial
        || has_perimeterx
        || has_datadome
}
