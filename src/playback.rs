use serde::Serialize;
use thiserror::Error;

use crate::catalog::MediaKind;

/// Permissions granted to the embedded player frame.
pub const EMBED_PERMISSIONS: &str =
    "autoplay; fullscreen; encrypted-media; clipboard-write; gyroscope; picture-in-picture";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProviderKind {
    /// Addressed by IMDb title id (`{imdb_id}`).
    ImdbKeyed,
    /// Addressed by the catalog's own numeric id (`{tmdb_id}`).
    CatalogKeyed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PlaybackProvider {
    pub name: &'static str,
    pub kind: ProviderKind,
    pub movie_template: &'static str,
    pub show_template: &'static str,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("season and episode are required for shows")]
    MissingEpisode,
    #[error("provider '{provider}' needs an IMDb id and none is known")]
    MissingExternalId { provider: &'static str },
    #[error("no playback provider at index {0}")]
    UnknownProvider(usize),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MediaIds {
    pub tmdb_id: u64,
    pub imdb_id: Option<String>,
}

impl MediaIds {
    pub fn new(tmdb_id: u64, imdb_id: Option<String>) -> Self {
        Self { tmdb_id, imdb_id }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EpisodeRef {
    pub season: u32,
    pub episode: u32,
}

impl EpisodeRef {
    pub fn new(season: u32, episode: u32) -> Self {
        Self { season, episode }
    }
}

impl Default for EpisodeRef {
    fn default() -> Self {
        Self::new(1, 1)
    }
}

/// Substitutes ids (and season/episode for shows) into the provider's template.
/// The resulting URL is not checked for reachability.
pub fn resolve(
    provider: &PlaybackProvider,
    ids: &MediaIds,
    kind: MediaKind,
    episode: Option<EpisodeRef>,
) -> Result<String, ResolveError> {
    let template = match kind {
        MediaKind::Movie => provider.movie_template,
        MediaKind::Tv => provider.show_template,
    };
    let url = match provider.kind {
        ProviderKind::ImdbKeyed => {
            let imdb = ids
                .imdb_id
                .as_deref()
                .ok_or(ResolveError::MissingExternalId {
                    provider: provider.name,
                })?;
            template.replace("{imdb_id}", imdb)
        }
        ProviderKind::CatalogKeyed => template.replace("{tmdb_id}", &ids.tmdb_id.to_string()),
    };
    match kind {
        MediaKind::Movie => Ok(url),
        MediaKind::Tv => {
            let ep = episode.ok_or(ResolveError::MissingEpisode)?;
            Ok(url
                .replace("{season}", &ep.season.to_string())
                .replace("{episode}", &ep.episode.to_string()))
        }
    }
}

pub fn provider(index: usize) -> Result<&'static PlaybackProvider, ResolveError> {
    PROVIDERS.get(index).ok_or(ResolveError::UnknownProvider(index))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmbedFrame {
    pub src: String,
    pub allow: &'static str,
    pub allow_fullscreen: bool,
}

/// Player state for one title: which provider is selected and, for shows,
/// which episode. Switching provider is the only recourse when a source fails
/// to play, since failures inside the frame are not observable here.
#[derive(Debug, Clone, Serialize)]
pub struct PlaybackSession {
    ids: MediaIds,
    kind: MediaKind,
    provider_index: usize,
    episode: Option<EpisodeRef>,
}

impl PlaybackSession {
    pub fn new(ids: MediaIds, kind: MediaKind) -> Self {
        let episode = match kind {
            MediaKind::Movie => None,
            MediaKind::Tv => Some(EpisodeRef::default()),
        };
        let mut session = Self {
            ids,
            kind,
            provider_index: 0,
            episode,
        };
        session.provider_index = session
            .available_providers()
            .first()
            .map(|(i, _)| *i)
            .unwrap_or(0);
        session
    }

    /// Providers this title can be resolved against, with their catalog index.
    pub fn available_providers(&self) -> Vec<(usize, &'static PlaybackProvider)> {
        PROVIDERS
            .iter()
            .enumerate()
            .filter(|(_, p)| p.kind == ProviderKind::CatalogKeyed || self.ids.imdb_id.is_some())
            .collect()
    }

    pub fn provider_index(&self) -> usize {
        self.provider_index
    }

    pub fn provider(&self) -> &'static PlaybackProvider {
        &PROVIDERS[self.provider_index]
    }

    pub fn episode(&self) -> Option<EpisodeRef> {
        self.episode
    }

    pub fn select_provider(&mut self, index: usize) -> Result<(), ResolveError> {
        let candidate = provider(index)?;
        if candidate.kind == ProviderKind::ImdbKeyed && self.ids.imdb_id.is_none() {
            return Err(ResolveError::MissingExternalId {
                provider: candidate.name,
            });
        }
        self.provider_index = index;
        Ok(())
    }

    /// Moves to the next usable provider, wrapping around. Returns the new index.
    pub fn next_provider(&mut self) -> usize {
        let available = self.available_providers();
        if let Some(pos) = available.iter().position(|(i, _)| *i == self.provider_index) {
            self.provider_index = available[(pos + 1) % available.len()].0;
        } else if let Some((i, _)) = available.first() {
            self.provider_index = *i;
        }
        self.provider_index
    }

    /// Ignored for movies.
    pub fn select_episode(&mut self, season: u32, episode: u32) {
        if self.kind == MediaKind::Tv {
            self.episode = Some(EpisodeRef::new(season.max(1), episode.max(1)));
        }
    }

    pub fn url(&self) -> Result<String, ResolveError> {
        resolve(self.provider(), &self.ids, self.kind, self.episode)
    }

    pub fn frame(&self) -> Result<EmbedFrame, ResolveError> {
        Ok(EmbedFrame {
            src: self.url()?,
            allow: EMBED_PERMISSIONS,
            allow_fullscreen: true,
        })
    }
}

const fn imdb(
    name: &'static str,
    movie_template: &'static str,
    show_template: &'static str,
) -> PlaybackProvider {
    PlaybackProvider {
        name,
        kind: ProviderKind::ImdbKeyed,
        movie_template,
        show_template,
    }
}

const fn tmdb(
    name: &'static str,
    movie_template: &'static str,
    show_template: &'static str,
) -> PlaybackProvider {
    PlaybackProvider {
        name,
        kind: ProviderKind::CatalogKeyed,
        movie_template,
        show_template,
    }
}

/// Embed endpoints in display order.
pub static PROVIDERS: &[PlaybackProvider] = &[
    imdb(
        "VidSrc VIP",
        "https://vidsrc.vip/embed/movie/{imdb_id}",
        "https://vidsrc.vip/embed/tv/{imdb_id}/{season}/{episode}",
    ),
    tmdb(
        "PStream",
        "https://iframe.pstream.mov/media/tmdb-movie-{tmdb_id}",
        "https://iframe.pstream.mov/media/tmdb-tv-{tmdb_id}-{season}-{episode}",
    ),
    imdb(
        "VidSrc TO",
        "https://vidsrc.to/embed/movie/{imdb_id}",
        "https://vidsrc.to/embed/tv/{imdb_id}/{season}/{episode}",
    ),
    imdb(
        "VidSrc ICU",
        "https://vidsrc.icu/embed/movie/{imdb_id}",
        "https://vidsrc.icu/embed/tv/{imdb_id}/{season}/{episode}",
    ),
    imdb(
        "VidSrc CC (IMDb)",
        "https://vidsrc.cc/v2/embed/movie/{imdb_id}",
        "https://vidsrc.cc/v2/embed/tv/{imdb_id}/{season}/{episode}",
    ),
    imdb(
        "EmbedSU (IMDb)",
        "https://embed.su/embed/movie/{imdb_id}",
        "https://embed.su/embed/tv/{imdb_id}/{season}/{episode}",
    ),
    imdb(
        "VidSrc ME",
        "https://vidsrc.me/embed/movie/{imdb_id}",
        "https://vidsrc.me/embed/tv/{imdb_id}/{season}/{episode}",
    ),
    imdb(
        "AutoEmbed Pro",
        "https://autoembed.pro/embed/movie/{imdb_id}",
        "https://autoembed.pro/embed/tv/{imdb_id}/{season}/{episode}",
    ),
    imdb(
        "VidFast",
        "https://vidfast.pro/movie/{imdb_id}",
        "https://vidfast.pro/tv/{imdb_id}/{season}/{episode}",
    ),
    imdb(
        "AutoEmbed Player",
        "https://player.autoembed.cc/embed/movie/{imdb_id}",
        "https://player.autoembed.cc/embed/tv/{imdb_id}/{season}/{episode}",
    ),
    imdb(
        "HyHD",
        "https://hyhd.org/embed/{imdb_id}",
        "https://hyhd.org/embed/tv/{imdb_id}/{season}/{episode}",
    ),
    imdb(
        "111Movies",
        "https://111movies.com/movie/{imdb_id}",
        "https://111movies.com/tv/{imdb_id}/{season}/{episode}",
    ),
    tmdb(
        "MultiEmbed",
        "https://multiembed.mov/?video_id={tmdb_id}&tmdb=1",
        "https://multiembed.mov/?video_id={tmdb_id}&tmdb=1&s={season}&e={episode}",
    ),
    tmdb(
        "MoviesAPI",
        "https://moviesapi.club/movie/{tmdb_id}",
        "https://moviesapi.club/tv/{tmdb_id}-{season}-{episode}",
    ),
    tmdb(
        "EmbedSU",
        "https://embed.su/embed/movie/{tmdb_id}",
        "https://embed.su/embed/tv/{tmdb_id}/{season}/{episode}",
    ),
    tmdb(
        "Hexa",
        "https://hexa.watch/watch/movie/{tmdb_id}",
        "https://hexa.watch/watch/tv/{tmdb_id}/{season}/{episode}",
    ),
    tmdb(
        "VidLink",
        "https://vidlink.pro/movie/{tmdb_id}",
        "https://vidlink.pro/tv/{tmdb_id}/{season}/{episode}",
    ),
    tmdb(
        "VidSrcXyz",
        "https://vidsrc.xyz/embed/movie/{tmdb_id}",
        "https://vidsrc.xyz/embed/tv/{tmdb_id}/{season}/{episode}",
    ),
    tmdb(
        "VidSrcRIP",
        "https://vidsrc.rip/embed/movie/{tmdb_id}",
        "https://vidsrc.rip/embed/tv/{tmdb_id}/{season}/{episode}",
    ),
    tmdb(
        "VidSrcSU",
        "https://vidsrc.su/embed/movie/{tmdb_id}",
        "https://vidsrc.su/embed/tv/{tmdb_id}/{season}/{episode}",
    ),
    tmdb(
        "VidSrcVIP",
        "https://vidsrc.vip/embed/movie/{tmdb_id}",
        "https://vidsrc.vip/embed/tv/{tmdb_id}/{season}/{episode}",
    ),
    tmdb(
        "2Embed",
        "https://www.2embed.cc/embed/{tmdb_id}",
        "https://www.2embed.cc/embedtv/{tmdb_id}&s={season}&e={episode}",
    ),
    tmdb(
        "123Embed",
        "https://play2.123embed.net/movie/{tmdb_id}",
        "https://play2.123embed.net/tv/{tmdb_id}/{season}/{episode}",
    ),
    tmdb(
        "SmashyStream",
        "https://player.smashy.stream/movie/{tmdb_id}",
        "https://player.smashy.stream/tv/{tmdb_id}?s={season}&e={episode}",
    ),
    tmdb(
        "VidEasy (4K)",
        "https://player.videasy.net/movie/{tmdb_id}?color=8834ec",
        "https://player.videasy.net/tv/{tmdb_id}/{season}/{episode}?color=8834ec",
    ),
    tmdb(
        "Vidify",
        "https://vidify.top/embed/movie/{tmdb_id}",
        "https://vidify.top/embed/tv/{tmdb_id}/{season}/{episode}",
    ),
    tmdb(
        "Flicky",
        "https://flicky.host/embed/movie/?id={tmdb_id}",
        "https://flicky.host/embed/tv/{tmdb_id}/{season}/{episode}",
    ),
    tmdb(
        "RiveStream",
        "https://rivestream.org/embed?type=movie&id={tmdb_id}",
        "https://rivestream.org/embed?type=tv&id={tmdb_id}&season={season}&episode={episode}",
    ),
    tmdb(
        "Vidora",
        "https://vidora.su/movie/{tmdb_id}",
        "https://vidora.su/tv/{tmdb_id}/{season}/{episode}",
    ),
    tmdb(
        "VidSrcCC",
        "https://vidsrc.cc/v2/embed/movie/{tmdb_id}?autoPlay=false",
        "https://vidsrc.cc/v2/embed/tv/{tmdb_id}/{season}/{episode}?autoPlay=false",
    ),
    tmdb(
        "StreamFlix",
        "https://watch.streamflix.one/movie/{tmdb_id}/watch?server=1",
        "https://watch.streamflix.one/tv/{tmdb_id}/watch?server=1&season={season}&episode={episode}",
    ),
    tmdb(
        "NebulaFlix",
        "https://nebulaflix.stream/movie?mt={tmdb_id}&server=1",
        "https://nebulaflix.stream/show?st={tmdb_id}&season={season}&episode={episode}&server=1",
    ),
    tmdb(
        "VidJoy",
        "https://vidjoy.pro/embed/movie/{tmdb_id}",
        "https://vidjoy.pro/embed/tv/{tmdb_id}/{season}/{episode}",
    ),
    tmdb(
        "VidZee",
        "https://player.vidzee.wtf/embed/movie/{tmdb_id}",
        "https://player.vidzee.wtf/embed/tv/{tmdb_id}/{season}/{episode}",
    ),
    tmdb(
        "Spenflix",
        "https://spencerdevs.xyz/movie/{tmdb_id}",
        "https://spencerdevs.xyz/tv/{tmdb_id}/{season}/{episode}",
    ),
    tmdb(
        "Frembed (FR)",
        "https://frembed.icu/api/film.php?id={tmdb_id}",
        "https://frembed.icu/api/serie.php?id={tmdb_id}&sa={season}&epi={episode}",
    ),
];
