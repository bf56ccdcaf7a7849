use std::io::Write;

use anyhow::{Context, Result, bail};
use tracing::debug;

use circle_store::Circle;
use circle_types::{AuthCredentials, DirectMessage, Post, ProfileUpdate, RegisterRequest};

use crate::cli::{Command, FriendsCommand, MessagesCommand};

/// Execute one command. Mirrors the web app's route guard: auth commands
/// bounce to the feed when already signed in, everything else needs a session.
pub fn run(circle: &mut Circle, command: Command, out: &mut impl Write) -> Result<()> {
    if command.is_public() {
        if let Some(user) = circle.auth.current_user() {
            writeln!(out, "Already signed in as {} <{}>", user.name, user.email)?;
            return feed(circle, out);
        }
    } else {
        circle
            .require_user()
            .context("run `circle login` or `circle register` first")?;
    }

    debug!(?command, "Running command");
    match command {
        Command::Register { name, email, password } => {
            let user = circle.auth.register(RegisterRequest { name, email, password })?;
            writeln!(out, "Welcome, {}! Your id is {}", user.name, user.id)?;
        }
        Command::Login { email, password } => {
            let user = circle.auth.login(AuthCredentials { email, password })?;
            writeln!(out, "Signed in as {}", user.name)?;
        }
        Command::Logout => {
            circle.auth.logout();
            writeln!(out, "Signed out")?;
        }
        Command::Whoami => {
            let user = circle.require_user()?;
            writeln!(out, "{} <{}> {}", user.name, user.email, user.avatar_color)?;
            writeln!(out, "id:      {}", user.id)?;
            writeln!(out, "bio:     {}", user.bio)?;
            writeln!(out, "friends: {}", user.friends.len())?;
            let unread = circle.messages.unread_total(&circle.auth);
            if unread > 0 {
                writeln!(out, "unread:  {}", unread)?;
            }
        }
        Command::Profile { name, bio } => {
            circle.auth.update_profile(ProfileUpdate { name, bio });
            let user = circle.require_user()?;
            writeln!(out, "{}: {}", user.name, user.bio)?;
        }
        Command::Directory => {
            for entry in circle.auth.friend_directory() {
                let marker = if entry.is_friend { "*" } else { " " };
                writeln!(out, "{} {}  {} <{}>", marker, entry.user.id, entry.user.name, entry.user.email)?;
            }
        }
        Command::Post { content } => {
            let post = circle.posts.create_post(&circle.auth, &content)?;
            writeln!(out, "Posted {}", post.id)?;
        }
        Command::Feed => feed(circle, out)?,
        Command::Like { post_id } => match circle.posts.toggle_like(&circle.auth, &post_id) {
            Some(true) => writeln!(out, "Liked {}", post_id)?,
            Some(false) => writeln!(out, "Unliked {}", post_id)?,
            None => bail!("No post with id {}", post_id),
        },
        Command::Posts { user_id } => {
            for post in circle.posts.posts_by_user(&user_id) {
                write_post(circle, post, out)?;
            }
        }
        Command::Friends(cmd) => friends(circle, cmd, out)?,
        Command::Messages(cmd) => messages(circle, cmd, out)?,
    }

    Ok(())
}

fn feed(circle: &Circle, out: &mut impl Write) -> Result<()> {
    let posts = circle.posts.feed(&circle.auth);
    if posts.is_empty() {
        writeln!(out, "Nothing here yet. Share something or add some friends.")?;
    }
    for post in posts {
        write_post(circle, post, out)?;
    }
    Ok(())
}

fn write_post(circle: &Circle, post: &Post, out: &mut impl Write) -> Result<()> {
    let liked = circle
        .auth
        .current_user_id()
        .is_some_and(|id| post.is_liked_by(id));

    writeln!(
        out,
        "[{}] {} · {} · {} like{}{}",
        post.id,
        display_name(circle, &post.author_id),
        post.created_at.format("%Y-%m-%d %H:%M"),
        post.like_count(),
        if post.like_count() == 1 { "" } else { "s" },
        if liked { " (you)" } else { "" },
    )?;
    writeln!(out, "    {}", post.content)?;
    Ok(())
}

fn display_name<'a>(circle: &'a Circle, user_id: &'a str) -> &'a str {
    circle
        .auth
        .find_user(user_id)
        .map(|u| u.name.as_str())
        .unwrap_or(user_id)
}

fn friends(circle: &mut Circle, cmd: FriendsCommand, out: &mut impl Write) -> Result<()> {
    match cmd {
        FriendsCommand::List => {
            let user = circle.require_user()?;
            writeln!(out, "Friends ({}):", user.friends.len())?;
            for id in &user.friends {
                writeln!(out, "  {}  {}", id, display_name(circle, id))?;
            }

            let incoming = circle.friends.incoming_requests(&circle.auth);
            if !incoming.is_empty() {
                writeln!(out, "Incoming:")?;
                for request in incoming {
                    writeln!(out, "  {}  from {}", request.id, display_name(circle, &request.from_user_id))?;
                }
            }

            let outgoing = circle.friends.outgoing_requests(&circle.auth);
            if !outgoing.is_empty() {
                writeln!(out, "Outgoing:")?;
                for request in outgoing {
                    writeln!(out, "  {}  to {}", request.id, display_name(circle, &request.to_user_id))?;
                }
            }
        }
        FriendsCommand::Request { user_id } => {
            ensure_user_exists(circle, &user_id)?;
            match circle.friends.send_request(&circle.auth, &user_id) {
                Some(request) => writeln!(out, "Sent {}", request.id)?,
                None => writeln!(out, "Nothing to do: already friends or a request is pending")?,
            }
        }
        FriendsCommand::Accept { request_id } => {
            ensure_incoming(circle, &request_id)?;
            if !circle.friends.accept_request(&mut circle.auth, &request_id) {
                bail!("No pending request {}", request_id);
            }
            writeln!(out, "Accepted {}", request_id)?;
        }
        FriendsCommand::Decline { request_id } => {
            ensure_incoming(circle, &request_id)?;
            if !circle.friends.decline_request(&request_id) {
                bail!("No pending request {}", request_id);
            }
            writeln!(out, "Declined {}", request_id)?;
        }
        FriendsCommand::Cancel { request_id } => {
            let me = circle.require_user()?.id.as_str();
            let owned = circle
                .friends
                .all_requests()
                .iter()
                .any(|r| r.id == request_id && r.from_user_id == me);
            if !owned {
                bail!("No request {} sent by you", request_id);
            }
            circle.friends.cancel_request(&request_id);
            writeln!(out, "Cancelled {}", request_id)?;
        }
        FriendsCommand::Remove { user_id } => {
            circle.friends.remove_friend(&mut circle.auth, &user_id);
            writeln!(out, "Removed {}", user_id)?;
        }
    }
    Ok(())
}

fn ensure_user_exists(circle: &Circle, user_id: &str) -> Result<()> {
    if circle.auth.find_user(user_id).is_none() {
        bail!("No user with id {}", user_id);
    }
    Ok(())
}

/// Only the addressee may answer a request.
fn ensure_incoming(circle: &Circle, request_id: &str) -> Result<()> {
    let incoming = circle.friends.incoming_requests(&circle.auth);
    if !incoming.iter().any(|r| r.id == request_id) {
        bail!("No pending request {} addressed to you", request_id);
    }
    Ok(())
}

fn messages(circle: &mut Circle, cmd: MessagesCommand, out: &mut impl Write) -> Result<()> {
    match cmd {
        MessagesCommand::Send { to, body } => {
            ensure_user_exists(circle, &to)?;
            let message = circle.messages.send_message(&circle.auth, &to, &body)?;
            writeln!(out, "Sent {}", message.id)?;
        }
        MessagesCommand::Show { user_id } => {
            for message in circle.messages.conversation_with(&circle.auth, &user_id) {
                write_message(circle, message, out)?;
            }
            circle.messages.mark_conversation_as_read(&circle.auth, &user_id);
        }
        MessagesCommand::Read { user_id } => {
            let changed = circle.messages.mark_conversation_as_read(&circle.auth, &user_id);
            writeln!(out, "Marked {} message(s) read", changed)?;
        }
        MessagesCommand::Inbox => {
            let conversations = circle.messages.conversations(&circle.auth);
            if conversations.is_empty() {
                writeln!(out, "No conversations yet")?;
            }
            for conversation in conversations {
                let preview = conversation
                    .last_message
                    .as_ref()
                    .map(|m| m.body.as_str())
                    .unwrap_or_default();
                writeln!(
                    out,
                    "{} ({} unread)  {}",
                    display_name(circle, &conversation.user_id),
                    conversation.unread_count,
                    preview,
                )?;
            }
        }
    }
    Ok(())
}

fn write_message(circle: &Circle, message: &DirectMessage, out: &mut impl Write) -> Result<()> {
    writeln!(
        out,
        "{} {}{}: {}",
        message.created_at.format("%Y-%m-%d %H:%M"),
        display_name(circle, &message.sender_id),
        if message.read { "" } else { " (new)" },
        message.body,
    )?;
    Ok(())
}
