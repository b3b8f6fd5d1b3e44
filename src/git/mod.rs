// src/git/mod.rs

//! Git remote driver
//!
//! Single doorway to git: no other module imports `git2`. A [`GitRepo`]
//! wraps a working directory; every operation runs as a task and opens the
//! repository inside it, because libgit2 handles must not cross threads.
//! Remote operations report two progress phases (fetching, checking out)
//! and funnel authentication through the [`credentials`] broker.

pub mod credentials;

pub use credentials::{
    set_credential_callback, CredentialKind, CredentialQuery, CredentialResponse,
};

use crate::error::{Error, Result};
use crate::task::{self, Future, Notifier};
use git2::build::{CheckoutBuilder, RepoBuilder};
use git2::{
    Cred, CredentialType, FetchOptions, RemoteCallbacks, Repository, RepositoryInitOptions,
    RepositoryOpenFlags, SubmoduleUpdateOptions,
};
use std::cell::Cell;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing::debug;

/// How the credential exchange ended, used to refine the final error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AuthOutcome {
    Untouched,
    /// The broker had nothing to offer
    Declined,
    /// The broker aborted the attempt
    Aborted,
}

/// A git repository at a fixed working directory
#[derive(Debug, Clone)]
pub struct GitRepo {
    dir: PathBuf,
}

impl GitRepo {
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create an empty repository at `dir`, creating the directory as needed
    pub fn init(dir: impl Into<PathBuf>) -> Future<GitRepo> {
        let dir = dir.into();
        task::spawn(move |_notifier| {
            let mut opts = RepositoryInitOptions::new();
            opts.mkpath(true);
            Repository::init_opts(&dir, &opts)?;
            debug!(dir = %dir.display(), "initialized repository");
            Ok(GitRepo { dir })
        })
    }

    /// Open an existing repository at exactly `dir` (no discovery upward)
    pub fn open(dir: impl Into<PathBuf>) -> Future<GitRepo> {
        let dir = dir.into();
        task::spawn(move |_notifier| {
            open_at(&dir)?;
            Ok(GitRepo { dir })
        })
    }

    /// Clone `url` into `dir` with a force, prefer-theirs checkout
    ///
    /// Progress is reported in two phases: fetching (received, total
    /// objects) then checking out.
    pub fn clone(dir: impl Into<PathBuf>, url: impl Into<String>) -> Future<GitRepo> {
        let dir = dir.into();
        let url = url.into();
        task::spawn(move |notifier| {
            notifier.status(format!("Cloning {url}..."));
            let auth = Rc::new(Cell::new(AuthOutcome::Untouched));

            let mut fetch = FetchOptions::new();
            fetch.remote_callbacks(remote_callbacks(notifier.clone(), Rc::clone(&auth)));

            let result = RepoBuilder::new()
                .fetch_options(fetch)
                .with_checkout(checkout_options(notifier.clone(), "HEAD"))
                .clone(&url, &dir);

            match result {
                Ok(_) => Ok(GitRepo { dir }),
                Err(err) => Err(refine_error(err, auth.get(), &url, notifier)),
            }
        })
    }

    /// Fetch from the `origin` remote
    pub fn fetch(&self) -> Future<()> {
        let dir = self.dir.clone();
        task::spawn(move |notifier| {
            let repo = open_at(&dir)?;
            let mut remote = repo.find_remote("origin")?;
            let url = remote.url().unwrap_or("origin").to_string();
            let auth = Rc::new(Cell::new(AuthOutcome::Untouched));

            let mut fetch = FetchOptions::new();
            fetch.remote_callbacks(remote_callbacks(notifier.clone(), Rc::clone(&auth)));

            remote
                .fetch(&[] as &[&str], Some(&mut fetch), None)
                .map_err(|err| refine_error(err, auth.get(), &url, notifier))
        })
    }

    /// Hard checkout of a revspec (branch, tag or sha)
    ///
    /// The work tree is rewritten with force, prefer-theirs semantics and
    /// HEAD is detached at the resolved commit.
    pub fn checkout(&self, revspec: impl Into<String>) -> Future<()> {
        let dir = self.dir.clone();
        let revspec = revspec.into();
        task::spawn(move |notifier| {
            let repo = open_at(&dir)?;
            let object = repo.revparse_single(&revspec)?;
            let commit = object.peel_to_commit()?;
            repo.checkout_tree(
                &object,
                Some(&mut checkout_options(notifier.clone(), &revspec)),
            )?;
            repo.set_head_detached(commit.id())?;
            Ok(())
        })
    }

    /// Fetch then checkout, delegated as one progress stream
    pub fn pull(&self, revspec: impl Into<String>) -> Future<()> {
        let repo = self.clone();
        let revspec = revspec.into();
        task::spawn(move |notifier| {
            notifier.delegate(repo.fetch())?;
            notifier.delegate(repo.checkout(revspec))
        })
    }

    /// Update all submodules with the fetch and checkout options above
    pub fn submodules_update(&self, init: bool) -> Future<()> {
        let dir = self.dir.clone();
        task::spawn(move |notifier| {
            let repo = open_at(&dir)?;
            let mut submodules = repo.submodules()?;
            let total = submodules.len() as u64;
            for (index, submodule) in submodules.iter_mut().enumerate() {
                notifier.check_canceled()?;
                let name = submodule.name().unwrap_or("<submodule>").to_string();
                notifier.status(format!("Updating submodule {name}..."));
                notifier.progress(index as u64, total);

                let auth = Rc::new(Cell::new(AuthOutcome::Untouched));
                let mut fetch = FetchOptions::new();
                fetch.remote_callbacks(remote_callbacks(notifier.clone(), Rc::clone(&auth)));
                let mut opts = SubmoduleUpdateOptions::new();
                opts.fetch(fetch);
                opts.checkout(checkout_options(notifier.clone(), &name));

                submodule
                    .update(init, Some(&mut opts))
                    .map_err(|err| refine_error(err, auth.get(), &name, notifier))?;
            }
            notifier.progress(total, total);
            Ok(())
        })
    }

    /// Branch the remote considers default, from `origin/HEAD`
    ///
    /// Falls back to `master` when the symbolic ref is absent, which
    /// matches mirrors cloned from older servers.
    pub fn default_branch(&self) -> Result<String> {
        let repo = open_at(&self.dir)?;
        if let Ok(reference) = repo.find_reference("refs/remotes/origin/HEAD") {
            if let Some(target) = reference.symbolic_target() {
                if let Some(name) = target.strip_prefix("refs/remotes/origin/") {
                    return Ok(name.to_string());
                }
            }
        }
        Ok("master".to_string())
    }
}

fn open_at(dir: &Path) -> Result<Repository> {
    Repository::open_ext(dir, RepositoryOpenFlags::NO_SEARCH, &[] as &[&OsStr])
        .map_err(Error::from)
}

/// Checkout options shared by clone, checkout and submodule update
fn checkout_options(notifier: Notifier, label: &str) -> CheckoutBuilder<'static> {
    let label = label.to_string();
    let mut announced = false;
    let mut checkout = CheckoutBuilder::new();
    checkout.force();
    checkout.use_theirs(true);
    checkout.progress(move |_path, current, total| {
        if !announced {
            notifier.status(format!("Checking out {label}..."));
            announced = true;
        }
        notifier.progress(current as u64, total as u64);
    });
    checkout
}

/// Remote callbacks wiring progress and the credential broker
///
/// The transfer callback aborts the transport when cancellation has been
/// requested, so a cancel lands mid-fetch instead of after it.
fn remote_callbacks(
    notifier: Notifier,
    auth: Rc<Cell<AuthOutcome>>,
) -> RemoteCallbacks<'static> {
    let mut callbacks = RemoteCallbacks::new();

    let progress_notifier = notifier.clone();
    let mut announced = false;
    callbacks.transfer_progress(move |stats| {
        if !announced {
            progress_notifier.status("Fetching...");
            announced = true;
        }
        progress_notifier.progress(stats.received_objects() as u64, stats.total_objects() as u64);
        !progress_notifier.canceled()
    });

    callbacks.credentials(move |url, username_from_url, allowed| {
        let query = CredentialQuery {
            url: url.to_string(),
            username_from_url: username_from_url.map(str::to_string),
            allowed: allowed_kinds(allowed),
        };
        match credentials::answer(&query) {
            CredentialResponse::Default => Cred::default(),
            CredentialResponse::Username(name) => Cred::username(&name),
            CredentialResponse::UserPass { username, password } => {
                Cred::userpass_plaintext(&username, &password)
            }
            CredentialResponse::SshKey {
                username,
                public_key,
                private_key,
                passphrase,
            } => Cred::ssh_key(
                &username,
                public_key.as_deref(),
                &private_key,
                passphrase.as_deref(),
            ),
            CredentialResponse::Invalid => {
                auth.set(AuthOutcome::Declined);
                Err(git2::Error::new(
                    git2::ErrorCode::Auth,
                    git2::ErrorClass::Callback,
                    "no usable credential offered",
                ))
            }
            CredentialResponse::Error => {
                auth.set(AuthOutcome::Aborted);
                Err(git2::Error::new(
                    git2::ErrorCode::Auth,
                    git2::ErrorClass::Callback,
                    "credential broker aborted authentication",
                ))
            }
        }
    });

    callbacks
}

fn allowed_kinds(allowed: CredentialType) -> Vec<CredentialKind> {
    let mut kinds = Vec::new();
    if allowed.is_default() {
        kinds.push(CredentialKind::Default);
    }
    if allowed.is_username() {
        kinds.push(CredentialKind::Username);
    }
    if allowed.is_user_pass_plaintext() {
        kinds.push(CredentialKind::UsernamePassword);
    }
    if allowed.is_ssh_key() {
        kinds.push(CredentialKind::SshKey);
    }
    if allowed.is_ssh_custom() {
        kinds.push(CredentialKind::SshCustom);
    }
    if allowed.is_ssh_interactive() {
        kinds.push(CredentialKind::SshInteractive);
    }
    kinds
}

/// Map a failed operation to the sharpest error kind available
fn refine_error(err: git2::Error, auth: AuthOutcome, subject: &str, notifier: &Notifier) -> Error {
    if notifier.canceled() {
        return Error::Canceled;
    }
    match auth {
        AuthOutcome::Declined => Error::AuthRequired(subject.to_string()),
        AuthOutcome::Aborted => Error::AuthFailed(subject.to_string()),
        AuthOutcome::Untouched => err.into(),
    }
}
