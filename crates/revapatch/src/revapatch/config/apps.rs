use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;
use serde::Deserialize;
use std::collections::BTreeMap;

/// An app the downloader can fetch from APKMirror.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AppEntry {
    /// Android package id, e.g. `com.reddit.frontpage`.
    pub package: String,
    /// APKMirror organisation slug.
    pub org: String,
    /// APKMirror app slug.
    pub repo: String,
    /// Overrides the configured download architecture.
    #[serde(default)]
    pub arch: Option<String>,
    /// Overrides the configured download DPI.
    #[serde(default)]
    pub dpi: Option<String>,
}

impl AppEntry {
    fn builtin(package: &str, org: &str, repo: &str, arch: Option<&str>) -> Self {
        Self {
            package: package.to_string(),
            org: org.to_string(),
            repo: repo.to_string(),
            arch: arch.map(str::to_string),
            dpi: None,
        }
    }
}

/// Human readable app names mapped to their download coordinates.
#[derive(Debug, Clone, Default)]
pub struct AppCatalog {
    apps: BTreeMap<String, AppEntry>,
}

impl AppCatalog {
    pub fn builtin() -> Self {
        const UNIVERSAL: Option<&str> = Some("universal");
        const NOARCH: Option<&str> = Some("noarch");

        let entries = [
            ("Amazon Shopping", "com.amazon.mShop.android.shopping", "amazon-mobile-llc", "amazon-shopping", None),
            ("Backdrops", "com.backdrops.wallpapers", "backdrops", "backdrops-wallpapers", NOARCH),
            ("CandyLink VPN", "com.candylink.openvpn", "liondev-io", "candylink-vpn", UNIVERSAL),
            ("Facebook", "com.facebook.katana", "facebook-2", "facebook", None),
            ("Icon Pack Studio", "ginlemon.iconpackstudio", "smart-launcher-team", "icon-pack-studio", NOARCH),
            ("Infinity for Reddit", "ml.docilealligator.infinityforreddit", "docile-alligator", "infinity-for-reddit", UNIVERSAL),
            ("Inshorts", "com.nis.app", "inshorts-formerly-news-in-shorts", "inshorts-news-in-60-words-2", None),
            ("Instagram", "com.instagram.android", "instagram", "instagram-instagram", None),
            ("irplus", "net.binarymode.android.irplus", "binarymode", "irplus-infrared-remote", NOARCH),
            ("Lightroom", "com.adobe.lrmobile", "adobe", "lightroom", None),
            ("Meme Generator", "com.zombodroid.MemeGenerator", "zombodroid", "meme-generator-free", UNIVERSAL),
            ("Messenger", "com.facebook.orca", "facebook-2", "messenger", None),
            ("Mi Fitness", "com.xiaomi.wearable", "beijing-xiaomi-mobile-software-co-ltd", "mi-wear-\u{5C0F}\u{7C73}\u{7A7F}\u{6234}", None),
            ("MyFitnessPal", "com.myfitnesspal.android", "myfitnesspal-inc", "calorie-counter-myfitnesspal", UNIVERSAL),
            ("NetGuard", "eu.faircode.netguard", "marcel-bokhorst", "netguard-no-root-firewall", UNIVERSAL),
            ("Nyx Music Player", "com.awedea.nyx", "awedea", "nyx-music-player", UNIVERSAL),
            ("pixiv", "jp.pxv.android", "pixiv-inc", "pixiv", NOARCH),
            ("Photomath", "com.microblink.photomath", "google-inc", "photomath", UNIVERSAL),
            ("Recorder", "com.google.android.apps.recorder", "google-inc", "google-recorder", None),
            ("Reddit", "com.reddit.frontpage", "redditinc", "reddit", UNIVERSAL),
            ("Solid Explorer", "pl.solidexplorer2", "neatbytes", "solid-explorer-beta", None),
            ("Sony Headphones Connect", "com.sony.songpal.mdr", "sony-corporation", "sony-headphones-connect", None),
            ("Strava", "com.strava", "strava-inc", "strava-running-and-cycling-gps", UNIVERSAL),
            ("Sync for Lemmy", "io.syncapps.lemmy_sync", "sync-apps-ltd", "sync-for-lemmy", None),
            ("TickTick", "com.ticktick.task", "ticktick-limited", "ticktick-to-do-list-with-reminder-day-planner", None),
            ("TikTok", "com.ss.android.ugc.trill", "tiktok-pte-ltd", "tik-tok", None),
            ("Trakt", "tv.trakt.trakt", "trakt", "trakt", UNIVERSAL),
            ("Tumblr", "com.tumblr", "tumblr-inc", "tumblr", UNIVERSAL),
            ("Twitch", "tv.twitch.android.app", "twitch-interactive-inc", "twitch", UNIVERSAL),
            ("WarnWetter", "de.dwd.warnapp", "deutscher-wetterdienst", "warnwetter", UNIVERSAL),
            ("Windy.app", "co.windyapp.android", "windy-weather-world-inc", "windy-wind-weather-forecast", UNIVERSAL),
            ("X", "com.twitter.android", "x-corp", "twitter", UNIVERSAL),
            ("Youtube", "com.google.android.youtube", "google-inc", "youtube", None),
            ("Youtube Music", "com.google.android.apps.youtube.music", "google-inc", "youtube-music", None),
            ("Yuka", "io.yuka.android", "yuka-apps", "yuka-food-cosmetic-scan", UNIVERSAL),
        ];

        let apps = entries
            .into_iter()
            .map(|(name, package, org, repo, arch)| {
                (name.to_string(), AppEntry::builtin(package, org, repo, arch))
            })
            .collect();

        Self { apps }
    }

    /// Adds or replaces entries, keyed by display name.
    pub fn extend<I: IntoIterator<Item = (String, AppEntry)>>(&mut self, entries: I) {
        self.apps.extend(entries);
    }

    /// Case-insensitive lookup, returns the canonical name with the entry.
    pub fn find(&self, name: &str) -> Option<(&str, &AppEntry)> {
        let wanted = name.to_lowercase();
        self.apps
            .iter()
            .find(|(k, _)| k.to_lowercase() == wanted)
            .map(|(k, v)| (k.as_str(), v))
    }

    pub fn get(&self, name: &str) -> Option<&AppEntry> {
        self.apps.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.apps.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.apps.len()
    }

    /// Up to `limit` app names that fuzzily resemble `query`, best first.
    pub fn suggest(&self, query: &str, limit: usize) -> Vec<&str> {
        let matcher = SkimMatcherV2::default().ignore_case();
        let mut scored: Vec<(i64, &str)> = self
            .names()
            .filter_map(|name| matcher.fuzzy_match(name, query).map(|score| (score, name)))
            .collect();

        scored.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(b.1)));
        scored.into_iter().take(limit).map(|(_, name)| name).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_catalog_has_every_app() {
        let catalog = AppCatalog::builtin();
        assert_eq!(catalog.len(), 35);

        let reddit = catalog.get("Reddit").unwrap();
        assert_eq!(reddit.package, "com.reddit.frontpage");
        assert_eq!(reddit.arch.as_deref(), Some("universal"));
        assert_eq!(catalog.get("Youtube").unwrap().arch, None);
    }

    #[test]
    fn find_ignores_case() {
        let catalog = AppCatalog::builtin();
        let (name, entry) = catalog.find("youtube music").unwrap();

        assert_eq!(name, "Youtube Music");
        assert_eq!(entry.repo, "youtube-music");
        assert!(catalog.find("Youtube Musik").is_none());
    }

    #[test]
    fn extend_overrides_builtin_entries() {
        let mut catalog = AppCatalog::builtin();
        let mut custom = catalog.get("Reddit").unwrap().clone();
        custom.dpi = Some("480dpi".into());
        catalog.extend([("Reddit".to_string(), custom)]);

        assert_eq!(catalog.get("Reddit").unwrap().dpi.as_deref(), Some("480dpi"));
    }

    #[test]
    fn suggest_ranks_close_names() {
        let catalog = AppCatalog::builtin();
        let suggestions = catalog.suggest("redit", 3);

        assert!(suggestions.contains(&"Reddit"));
        assert!(suggestions.len() <= 3);
    }
}
